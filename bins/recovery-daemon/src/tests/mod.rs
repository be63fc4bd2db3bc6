use super::*;
use crate::config::{ChannelConfig, IdentityConfig, LoggingConfig};
use recovery_core::channel::InMemoryChannel;
use recovery_core::config::SyncConfig;
use recovery_core::PayloadCipher;
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::tempdir;

mod config_validation_tests;

const KEY: &str = "daemon-test-key";

#[tokio::test]
async fn config_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("recovery.toml");
    let cfg = format!(
        r#"
data_dir = "{dir}"
exit_when_drained = true

[identity]
id = "me"

[channel]
base_url = "https://recovery.example.com/profile"
key = "secret"

[sync]
max_parallel_downloads = 2
poll_interval_ms = 500

[logging]
level = "debug"
"#,
        dir = dir.path().display()
    );
    std::fs::write(&path, cfg).unwrap();
    let loaded = config::load_config(&path).unwrap();
    assert_eq!(loaded.identity.id, "me");
    assert_eq!(loaded.channel.timeout_secs, 15);
    assert_eq!(loaded.sync.max_parallel_downloads, 2);
    assert_eq!(loaded.sync.item_timeout_ms, SyncConfig::default().item_timeout_ms);
    assert!(loaded.exit_when_drained);
    assert_eq!(loaded.snapshot_path(), dir.path().join("recovery.json"));
}

#[tokio::test]
async fn drained_channel_writes_snapshot() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    let channel = InMemoryChannel::new();
    let daemon = init_daemon(&cfg, Arc::new(channel.clone())).await.unwrap();
    let id = daemon.session.channel_id().clone();
    put(&channel, &id, "data", json!({"signingKey": "me", "timestamp": 7, "name": "Me"})).await;
    put(
        &channel,
        &id,
        "connection_A",
        json!({"id": "A", "name": "Alice", "score": 90.0, "timestamp": 1,
               "photo": "data:image/png;base64,aGVsbG8="}),
    )
    .await;
    let boot = bootstrap(&daemon).await.unwrap();
    assert_eq!(boot.signing_key, "me");

    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        run_polls(&daemon, std::future::pending()),
    )
    .await;
    assert!(finished.unwrap().is_ok());

    let raw = std::fs::read(cfg.snapshot_path()).unwrap();
    let snapshot: Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(snapshot["identity"], "me");
    assert_eq!(
        snapshot["channel"]["channel_id"]["value"],
        daemon.session.channel_id().to_string()
    );
    assert_eq!(snapshot["progress"]["name"], "Me");
    assert_eq!(snapshot["progress"]["recovered_connections"], 1);
    assert_eq!(snapshot["store"]["connections"][0]["id"], "A");
    assert!(cfg.photos_dir().join("A.png").exists());
}

#[tokio::test]
async fn shutdown_stops_polling() {
    let dir = tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    cfg.exit_when_drained = false;
    let channel = InMemoryChannel::new();
    let daemon = init_daemon(&cfg, Arc::new(channel)).await.unwrap();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        run_polls(&daemon, tokio::time::sleep(Duration::from_millis(50))),
    )
    .await;
    assert!(result.unwrap().is_ok());
    assert!(cfg.snapshot_path().exists());
}

#[tokio::test]
async fn shutdown_waits_for_the_cycle_in_flight() {
    let dir = tempdir().unwrap();
    let mut cfg = test_config(dir.path().to_path_buf());
    cfg.exit_when_drained = false;
    cfg.sync.item_timeout_ms = 300;
    let channel = InMemoryChannel::new();
    let daemon = init_daemon(&cfg, Arc::new(channel.clone())).await.unwrap();
    let id = daemon.session.channel_id().clone();
    for key in ["A", "B", "S"] {
        put(
            &channel,
            &id,
            &format!("connection_{}", key),
            json!({"id": key, "name": key, "score": 1.0, "timestamp": 1}),
        )
        .await;
    }
    channel.make_slow("connection_S").await;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        run_polls(&daemon, tokio::time::sleep(Duration::from_millis(20))),
    )
    .await;
    assert!(result.unwrap().is_ok());

    let raw = std::fs::read(cfg.snapshot_path()).unwrap();
    let snapshot: Value = serde_json::from_slice(&raw).unwrap();
    let stored = snapshot["store"]["connections"].as_array().unwrap().len() as u64;
    assert_eq!(stored, 2);
    assert_eq!(snapshot["progress"]["recovered_connections"], stored);
}

#[test]
fn config_flag_selects_the_file() {
    let args = |v: &[&str]| v.iter().map(|a| a.to_string()).collect::<Vec<_>>();
    assert_eq!(config_path(args(&[])), PathBuf::from("recovery.toml"));
    assert_eq!(
        config_path(args(&["--config", "/etc/recovery.toml"])),
        PathBuf::from("/etc/recovery.toml")
    );
    assert_eq!(config_path(args(&["--config"])), PathBuf::from("recovery.toml"));
    assert_eq!(
        config_path(args(&["--config", "a.toml", "--config", "b.toml"])),
        PathBuf::from("b.toml")
    );
}

#[test]
fn log_level_falls_back_to_info() {
    assert_eq!(level_filter("debug"), LevelFilter::Debug);
    assert_eq!(level_filter("WARN"), LevelFilter::Warn);
    assert_eq!(level_filter("off"), LevelFilter::Off);
    assert_eq!(level_filter("chatty"), LevelFilter::Info);
}

#[tokio::test]
async fn missing_bundle_fails_bootstrap() {
    let dir = tempdir().unwrap();
    let cfg = test_config(dir.path().to_path_buf());
    let daemon = init_daemon(&cfg, Arc::new(InMemoryChannel::new())).await.unwrap();
    let err = bootstrap(&daemon).await.unwrap_err();
    assert!(matches!(err, DaemonError::Recovery(SyncError::BadChannelData(_))));
}

#[test]
fn http_client_builds_endpoint_urls() {
    let cfg = test_config(PathBuf::from("/tmp/unused"));
    let client = ChannelHttpClient::new(&cfg.channel).unwrap();
    let channel = recovery_core::ChannelId::new("abc");
    assert_eq!(client.list_url(&channel), "https://recovery.example.com/profile/list/abc");
    assert_eq!(
        client.download_url(&channel, "sig_A"),
        "https://recovery.example.com/profile/download/abc/sig_A"
    );
    assert_eq!(client.upload_url(&channel), "https://recovery.example.com/profile/upload/abc");
}

async fn put(channel: &InMemoryChannel, id: &recovery_core::ChannelId, data_id: &str, body: Value) {
    let key = SymmetricKey::new(KEY).unwrap();
    let blob = XChaChaCipher::new()
        .encrypt(body.to_string().as_bytes(), &key)
        .unwrap();
    channel.upload(id, data_id, blob).await.unwrap();
}

pub(super) fn test_config(data_dir: PathBuf) -> RecoveryConfig {
    RecoveryConfig {
        data_dir,
        identity: IdentityConfig {
            id: "me".to_string(),
        },
        channel: ChannelConfig {
            base_url: "https://recovery.example.com/profile/".to_string(),
            key: KEY.to_string(),
            timeout_secs: 5,
        },
        sync: SyncConfig {
            poll_interval_ms: 10,
            ..SyncConfig::default()
        },
        logging: LoggingConfig {
            level: "error".to_string(),
        },
        exit_when_drained: true,
    }
}
