//! State of one recovery attempt.
//!
//! The identity, key and channel coordinates are fixed at creation. The
//! progress half (profile, cosignatures, counters) is shared between clones
//! and is only written by the sync orchestrator. Counters are atomics so a
//! merge tally can be flushed from `Drop` when a sync call is abandoned.

use crate::channel::{channel_id_for_key, ChannelId};
use crate::cipher::SymmetricKey;
use crate::error::SessionError;
use recovery_api::types::{Cosignature, ProfileRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCoordinates {
    pub channel_id: ChannelId,
    pub opened_at_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryProgress {
    pub name: Option<String>,
    pub photo: Option<String>,
    pub sigs: BTreeMap<String, Cosignature>,
    pub recovered_connections: u64,
    pub recovered_groups: u64,
}

#[derive(Clone)]
pub struct RecoverySession {
    identity: String,
    key: SymmetricKey,
    channel: ChannelCoordinates,
    progress: Arc<Mutex<RecoveryProgress>>,
    recovered_connections: Arc<AtomicU64>,
    recovered_groups: Arc<AtomicU64>,
    nameless_bundle: Arc<AtomicBool>,
}

impl RecoverySession {
    pub fn new(identity: impl Into<String>, key: SymmetricKey) -> Result<Self, SessionError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(SessionError::EmptyIdentity);
        }
        let channel = ChannelCoordinates {
            channel_id: channel_id_for_key(&key),
            opened_at_ms: opened_at_ms(),
        };
        Ok(Self {
            identity,
            key,
            channel,
            progress: Arc::new(Mutex::new(RecoveryProgress::default())),
            recovered_connections: Arc::new(AtomicU64::new(0)),
            recovered_groups: Arc::new(AtomicU64::new(0)),
            nameless_bundle: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The identity being recovered.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn channel(&self) -> &ChannelCoordinates {
        &self.channel
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel.channel_id
    }

    pub(crate) fn key(&self) -> &SymmetricKey {
        &self.key
    }

    pub async fn name(&self) -> Option<String> {
        self.progress.lock().await.name.clone()
    }

    pub async fn signers(&self) -> HashSet<String> {
        self.progress.lock().await.sigs.keys().cloned().collect()
    }

    pub async fn signature(&self, signer: &str) -> Option<Cosignature> {
        self.progress.lock().await.sigs.get(signer).cloned()
    }

    pub async fn progress(&self) -> RecoveryProgress {
        let mut progress = self.progress.lock().await.clone();
        progress.recovered_connections = self.recovered_connections.load(Ordering::SeqCst);
        progress.recovered_groups = self.recovered_groups.load(Ordering::SeqCst);
        progress
    }

    /// First name wins; later profiles are ignored.
    pub(crate) async fn set_name_photo(&self, profile: ProfileRecord) -> bool {
        let mut guard = self.progress.lock().await;
        if guard.name.is_some() {
            return false;
        }
        guard.name = Some(profile.name);
        guard.photo = profile.photo;
        true
    }

    /// First signature per signer wins.
    pub(crate) async fn set_signature(&self, signer: String, sig: Cosignature) -> bool {
        let mut guard = self.progress.lock().await;
        if guard.sigs.contains_key(&signer) {
            return false;
        }
        guard.sigs.insert(signer, sig);
        true
    }

    pub(crate) fn increase_recovered_connections(&self, count: u64) {
        self.recovered_connections.fetch_add(count, Ordering::SeqCst);
    }

    pub(crate) fn increase_recovered_groups(&self, count: u64) {
        self.recovered_groups.fetch_add(count, Ordering::SeqCst);
    }

    /// The `data` bundle decoded but carries no name, so it can never be a
    /// profile source. Its content is fixed once uploaded.
    pub(crate) fn mark_nameless_bundle(&self) {
        self.nameless_bundle.store(true, Ordering::SeqCst);
    }

    pub(crate) fn has_nameless_bundle(&self) -> bool {
        self.nameless_bundle.load(Ordering::SeqCst)
    }
}

fn opened_at_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

impl std::fmt::Debug for RecoverySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverySession")
            .field("identity", &self.identity)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
