use super::*;
use crate::config::ConfigError;

#[test]
fn accepts_test_config() {
    assert!(test_config(PathBuf::from("/tmp/recovery")).validate().is_ok());
}

#[test]
fn rejects_blank_identity() {
    let mut cfg = test_config(PathBuf::from("/tmp/recovery"));
    cfg.identity.id = "  ".to_string();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid("identity.id"))));
}

#[test]
fn rejects_empty_key() {
    let mut cfg = test_config(PathBuf::from("/tmp/recovery"));
    cfg.channel.key.clear();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid("channel.key"))));
}

#[test]
fn rejects_non_http_base_url() {
    let mut cfg = test_config(PathBuf::from("/tmp/recovery"));
    cfg.channel.base_url = "ftp://recovery.example.com".to_string();
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid("channel.base_url"))));
}

#[test]
fn rejects_zero_timeout() {
    let mut cfg = test_config(PathBuf::from("/tmp/recovery"));
    cfg.channel.timeout_secs = 0;
    assert!(matches!(cfg.validate(), Err(ConfigError::Invalid("channel.timeout_secs"))));
}

#[test]
fn unknown_sync_field_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recovery.toml");
    std::fs::write(
        &path,
        r#"
data_dir = "/tmp/recovery"

[identity]
id = "me"

[channel]
base_url = "http://localhost:8080"
key = "k"

[sync]
retries = 3
"#,
    )
    .unwrap();
    assert!(matches!(config::load_config(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(config::load_config(&missing), Err(ConfigError::Io)));
}
