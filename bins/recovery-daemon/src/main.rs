mod clients;
mod config;

use clients::channel_http::ChannelHttpClient;
use config::RecoveryConfig;
use log::{error, info, warn, LevelFilter};
use recovery_api::types::RecoveryBootstrap;
use recovery_core::channel::ChannelTransport;
use recovery_core::session::ChannelCoordinates;
use recovery_core::store::StoreSnapshot;
use recovery_core::{
    ChannelSync, FsImageStore, InMemoryRecoveryStore, RecoveryProgress, RecoverySession,
    SymmetricKey, SyncError, XChaChaCipher,
};
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::oneshot;

#[derive(thiserror::Error, Debug)]
enum DaemonError {
    #[error("config {0}")]
    Config(#[from] config::ConfigError),
    #[error("setup {0}")]
    Setup(String),
    #[error("{0}")]
    Recovery(SyncError),
    #[error("snapshot {0}")]
    Snapshot(String),
}

struct Daemon {
    session: RecoverySession,
    sync: ChannelSync,
    store: InMemoryRecoveryStore,
    snapshot_path: PathBuf,
    exit_when_drained: bool,
}

#[derive(Serialize)]
struct RecoverySnapshot {
    identity: String,
    channel: ChannelCoordinates,
    progress: RecoveryProgress,
    store: StoreSnapshot,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let path = config_path(std::env::args().skip(1));
    let cfg = config::load_config(&path)?;
    init_logging(&cfg);
    let channel = ChannelHttpClient::new(&cfg.channel)
        .map_err(|e| DaemonError::Setup(e.to_string()))?;
    let daemon = init_daemon(&cfg, Arc::new(channel)).await?;
    let bootstrap = bootstrap(&daemon).await?;
    info!(
        "recovering {} (uploaded at {})",
        daemon.session.identity(),
        bootstrap.timestamp
    );
    // listen from now on, not only while the loop is waiting
    let (stop_tx, stop_rx) = oneshot::channel();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(());
        }
    });
    run_polls(&daemon, async {
        let _ = stop_rx.await;
    })
    .await
}

/// Value of `--config <path>`, last one wins; `recovery.toml` otherwise.
fn config_path<I>(args: I) -> PathBuf
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut path = None;
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(value) = args.next() {
                path = Some(PathBuf::from(value));
            }
        }
    }
    path.unwrap_or_else(|| PathBuf::from("recovery.toml"))
}

fn level_filter(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}

fn init_logging(cfg: &RecoveryConfig) {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level_filter(&cfg.logging.level))
        .try_init();
}

async fn init_daemon(
    cfg: &RecoveryConfig,
    channel: Arc<dyn ChannelTransport>,
) -> Result<Daemon, DaemonError> {
    tokio::fs::create_dir_all(&cfg.data_dir)
        .await
        .map_err(|e| DaemonError::Setup(format!("data_dir: {}", e)))?;
    let images = FsImageStore::open(cfg.photos_dir(), cfg.sync.max_photo_bytes)
        .await
        .map_err(|e| DaemonError::Setup(e.to_string()))?;
    let key = SymmetricKey::new(cfg.channel.key.clone())
        .map_err(|e| DaemonError::Setup(e.to_string()))?;
    let session = RecoverySession::new(cfg.identity.id.clone(), key)
        .map_err(|e| DaemonError::Setup(e.to_string()))?;
    let store = InMemoryRecoveryStore::new();
    let sync = ChannelSync::new(
        channel,
        Arc::new(XChaChaCipher::new()),
        Arc::new(images),
        Arc::new(store.clone()),
        cfg.sync.clone(),
    );
    info!("listening on channel {}", session.channel_id());
    Ok(Daemon {
        session,
        sync,
        store,
        snapshot_path: cfg.snapshot_path(),
        exit_when_drained: cfg.exit_when_drained,
    })
}

async fn bootstrap(daemon: &Daemon) -> Result<RecoveryBootstrap, DaemonError> {
    daemon
        .sync
        .load_recovery_data(&daemon.session)
        .await
        .map_err(|e| {
            error!("{}", e);
            DaemonError::Recovery(e)
        })
}

/// Polls the channel until `shutdown` resolves, or until a cycle finds nothing
/// new when `exit_when_drained` is set. Shutdown is only honored between
/// cycles: a cycle in flight always runs to completion. Writes the snapshot
/// after every cycle and once more on the way out.
async fn run_polls<F>(daemon: &Daemon, shutdown: F) -> Result<(), DaemonError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let interval = daemon.sync.config().poll_interval();
    loop {
        match daemon.sync.poll_once(&daemon.session).await {
            Ok(summary) => {
                info!(
                    "poll: {} listed, {} merged",
                    summary.manifest_len,
                    summary.merged()
                );
                write_snapshot(&daemon.snapshot_path, daemon).await?;
                if daemon.exit_when_drained && summary.is_drained() {
                    info!("channel drained");
                    break;
                }
            }
            Err(e) => warn!("poll failed: {}", e),
        }
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    write_snapshot(&daemon.snapshot_path, daemon).await
}

async fn write_snapshot(path: &Path, daemon: &Daemon) -> Result<(), DaemonError> {
    let snapshot = RecoverySnapshot {
        identity: daemon.session.identity().to_string(),
        channel: daemon.session.channel().clone(),
        progress: daemon.session.progress().await,
        store: daemon.store.snapshot().await,
    };
    let body = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| DaemonError::Snapshot(e.to_string()))?;
    tokio::fs::write(path, body)
        .await
        .map_err(|e| DaemonError::Snapshot(e.to_string()))
}

#[cfg(test)]
mod tests;
