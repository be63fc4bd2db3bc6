use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct SyncConfig {
    pub max_parallel_downloads: usize,
    pub item_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_photo_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_parallel_downloads: 4,
            item_timeout_ms: 10_000,
            poll_interval_ms: 3_000,
            max_photo_bytes: 5 * 1024 * 1024,
        }
    }
}

impl SyncConfig {
    pub fn fan_out(&self) -> usize {
        self.max_parallel_downloads.max(1)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
