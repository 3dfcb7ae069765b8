//! Error types for the tab synchronization core
//!
//! Only decoding failures can reach the host at runtime: a payload at a
//! watched key that is not valid JSON for the channel's value type. Such a
//! message is dropped, never retried, and reported through the store's
//! dispatch report.

use std::path::PathBuf;

/// Errors surfaced by the synchronization core
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Payload at a watched key could not be decoded
    #[error("failed to decode payload at key '{key}': {source}")]
    Deserialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local value could not be encoded for publishing
    #[error("failed to encode value for channel '{channel}': {source}")]
    Serialization {
        channel: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file missing or malformed
    #[error("invalid configuration at {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl SyncError {
    /// Key the failing message was read from, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            SyncError::Deserialization { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether the failure came from a remote message rather than local use
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Deserialization { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialization_error_carries_key() {
        let source = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = SyncError::Deserialization {
            key: "shared-data_update".into(),
            source,
        };

        assert_eq!(err.key(), Some("shared-data_update"));
        assert!(err.is_remote());
        assert!(err.to_string().contains("shared-data_update"));
    }

    #[test]
    fn test_config_error_display() {
        let err = SyncError::Config {
            path: PathBuf::from("/tmp/tabsync.toml"),
            message: "missing".into(),
        };

        assert!(!err.is_remote());
        assert_eq!(err.key(), None);
        assert!(err.to_string().contains("/tmp/tabsync.toml"));
    }
}
