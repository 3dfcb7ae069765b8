use tabsync::config::{SyncConfig, DEFAULT_BACKLOG_WARN_THRESHOLD};
use tabsync::{BroadcastHub, SyncError};
use tempfile::TempDir;

#[test]
fn loads_toml_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("tabsync.toml");
    std::fs::write(&path, "inbox_capacity = 8\nlog_filter = \"debug\"\n")?;

    let config = SyncConfig::load(&path)?;
    assert_eq!(config.inbox_capacity, 8);
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.backlog_warn_threshold, DEFAULT_BACKLOG_WARN_THRESHOLD);
    Ok(())
}

#[test]
fn loads_json_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.json");
    let raw = serde_json::json!({ "inbox_capacity": 4, "backlog_warn_threshold": 2 });
    std::fs::write(&path, serde_json::to_string_pretty(&raw)?)?;

    let config = SyncConfig::load(&path)?;
    assert_eq!(config.inbox_capacity, 4);
    assert_eq!(config.backlog_warn_threshold, 2);

    // The capacity is honoured by the hub
    let hub = BroadcastHub::with_config(&config);
    let a = hub.connect();
    let b = hub.connect();
    for i in 0..10 {
        tabsync::BroadcastStore::set_item(&a, "k", &i.to_string());
    }
    assert_eq!(b.pending(), 4);
    Ok(())
}

#[test]
fn rejects_malformed_config() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "inbox_capacity = \"lots\"")?;

    let err = SyncConfig::load(&path).unwrap_err();
    assert!(matches!(err, SyncError::Config { .. }));
    Ok(())
}

#[test]
fn missing_config_file_is_an_error() {
    let err = SyncConfig::load("/definitely/not/here.toml").unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.toml"));
}
