use crate::cipher::SymmetricKey;
use crate::error::ChannelError;
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId {
    pub value: String,
}

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

/// Channel identity is a one-way function of the key, so possession of the
/// key is what binds a reader to a channel.
pub fn channel_id_for_key(key: &SymmetricKey) -> ChannelId {
    let digest = Sha256::digest(key.expose().as_bytes());
    ChannelId::new(URL_SAFE_NO_PAD.encode(digest))
}

#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn list(&self, channel: &ChannelId) -> Result<Vec<String>, ChannelError>;
    async fn download(&self, channel: &ChannelId, data_id: &str) -> Result<Vec<u8>, ChannelError>;
    async fn upload(
        &self,
        channel: &ChannelId,
        data_id: &str,
        data: Vec<u8>,
    ) -> Result<(), ChannelError>;
}

#[derive(Default)]
struct Faults {
    unavailable: HashSet<String>,
    slow: HashSet<String>,
}

#[derive(Clone, Default)]
pub struct InMemoryChannel {
    entries: Arc<Mutex<HashMap<ChannelId, Vec<(String, Vec<u8>)>>>>,
    faults: Arc<Mutex<Faults>>,
    fail_list: Arc<AtomicBool>,
    downloads: Arc<AtomicUsize>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Downloads of `data_id` fail with a transport error until cleared.
    pub async fn make_unavailable(&self, data_id: &str) {
        self.faults
            .lock()
            .await
            .unavailable
            .insert(data_id.to_string());
    }

    /// Downloads of `data_id` stall for a long time.
    pub async fn make_slow(&self, data_id: &str) {
        self.faults.lock().await.slow.insert(data_id.to_string());
    }

    pub fn set_list_failure(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelTransport for InMemoryChannel {
    async fn list(&self, channel: &ChannelId) -> Result<Vec<String>, ChannelError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ChannelError::Transport("list".to_string()));
        }
        let guard = self.entries.lock().await;
        let ids = guard
            .get(channel)
            .map(|items| items.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default();
        Ok(ids)
    }

    async fn download(&self, channel: &ChannelId, data_id: &str) -> Result<Vec<u8>, ChannelError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let slow = {
            let faults = self.faults.lock().await;
            if faults.unavailable.contains(data_id) {
                return Err(ChannelError::Transport("unavailable".to_string()));
            }
            faults.slow.contains(data_id)
        };
        if slow {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        let guard = self.entries.lock().await;
        guard
            .get(channel)
            .and_then(|items| items.iter().find(|(id, _)| id == data_id))
            .map(|(_, data)| data.clone())
            .ok_or(ChannelError::NotFound)
    }

    async fn upload(
        &self,
        channel: &ChannelId,
        data_id: &str,
        data: Vec<u8>,
    ) -> Result<(), ChannelError> {
        let mut guard = self.entries.lock().await;
        let items = guard.entry(channel.clone()).or_default();
        match items.iter_mut().find(|(id, _)| id == data_id) {
            Some(existing) => existing.1 = data,
            None => items.push((data_id.to_string(), data)),
        }
        Ok(())
    }
}
