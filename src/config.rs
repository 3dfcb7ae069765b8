//! Runtime configuration for the in-memory broadcast host and logging

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, SyncError};

/// Default number of undelivered notifications a participant may hold
pub const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// Default backlog at which a participant's inbox is reported as lagging
pub const DEFAULT_BACKLOG_WARN_THRESHOLD: usize = 800;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Bounded inbox size per participant
    pub inbox_capacity: usize,

    /// Inbox length that triggers a backlog warning
    pub backlog_warn_threshold: usize,

    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            backlog_warn_threshold: DEFAULT_BACKLOG_WARN_THRESHOLD,
            log_filter: "info".to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from a `.toml` file, or JSON for any other extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let config: Self = if is_toml {
            toml::from_str(&raw).map_err(|e| SyncError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|e| SyncError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        config.validated(path)
    }

    fn validated(self, path: &Path) -> Result<Self> {
        if self.inbox_capacity == 0 {
            return Err(SyncError::Config {
                path: path.to_path_buf(),
                message: "inbox_capacity must be greater than zero".into(),
            });
        }
        Ok(self)
    }
}

/// Install the global `tracing` subscriber; a no-op if one is already set
pub fn init_tracing(config: &SyncConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
