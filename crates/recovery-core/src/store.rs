use crate::error::StoreError;
use async_trait::async_trait;
use recovery_api::types::{ConnectionRecord, GroupRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Local connection and group state that recovered records are merged into.
///
/// `add_*` are insert-if-absent and the sole authority on uniqueness: they
/// return `false` and leave the stored record untouched when the id exists.
#[async_trait]
pub trait RecoveryStore: Send + Sync {
    async fn connection_ids(&self) -> Result<HashSet<String>, StoreError>;
    async fn group_ids(&self) -> Result<HashSet<String>, StoreError>;
    async fn add_connection(&self, record: ConnectionRecord) -> Result<bool, StoreError>;
    async fn add_group(&self, record: GroupRecord) -> Result<bool, StoreError>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub connections: Vec<ConnectionRecord>,
    pub groups: Vec<GroupRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryRecoveryStore {
    state: Arc<Mutex<StoreSnapshot>>,
    fail_reads: Arc<AtomicBool>,
}

impl InMemoryRecoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().await.clone()
    }

    pub async fn connection(&self, id: &str) -> Option<ConnectionRecord> {
        let guard = self.state.lock().await;
        guard.connections.iter().find(|c| c.id == id).cloned()
    }

    pub async fn group(&self, id: &str) -> Option<GroupRecord> {
        let guard = self.state.lock().await;
        guard.groups.iter().find(|g| g.id == id).cloned()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecoveryStore for InMemoryRecoveryStore {
    async fn connection_ids(&self) -> Result<HashSet<String>, StoreError> {
        self.check_reads()?;
        let guard = self.state.lock().await;
        Ok(guard.connections.iter().map(|c| c.id.clone()).collect())
    }

    async fn group_ids(&self) -> Result<HashSet<String>, StoreError> {
        self.check_reads()?;
        let guard = self.state.lock().await;
        Ok(guard.groups.iter().map(|g| g.id.clone()).collect())
    }

    async fn add_connection(&self, record: ConnectionRecord) -> Result<bool, StoreError> {
        let mut guard = self.state.lock().await;
        if guard.connections.iter().any(|c| c.id == record.id) {
            return Ok(false);
        }
        guard.connections.push(record);
        Ok(true)
    }

    async fn add_group(&self, record: GroupRecord) -> Result<bool, StoreError> {
        let mut guard = self.state.lock().await;
        if guard.groups.iter().any(|g| g.id == record.id) {
            return Ok(false);
        }
        guard.groups.push(record);
        Ok(true)
    }
}
