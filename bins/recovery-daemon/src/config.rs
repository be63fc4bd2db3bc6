use recovery_core::config::SyncConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct RecoveryConfig {
    pub data_dir: PathBuf,
    pub identity: IdentityConfig,
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub exit_when_drained: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IdentityConfig {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChannelConfig {
    pub base_url: String,
    pub key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io")]
    Io,
    #[error("parse {0}")]
    Parse(String),
    #[error("invalid {0}")]
    Invalid(&'static str),
}

impl RecoveryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.id.trim().is_empty() {
            return Err(ConfigError::Invalid("identity.id"));
        }
        if self.channel.key.is_empty() {
            return Err(ConfigError::Invalid("channel.key"));
        }
        let url = self.channel.base_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid("channel.base_url"));
        }
        if self.channel.timeout_secs == 0 {
            return Err(ConfigError::Invalid("channel.timeout_secs"));
        }
        Ok(())
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("recovery.json")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.data_dir.join("photos")
    }
}

pub fn load_config(path: &Path) -> Result<RecoveryConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
    let cfg: RecoveryConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}
