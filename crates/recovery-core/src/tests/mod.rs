pub mod groups_tests;

use crate::channel::{ChannelTransport, InMemoryChannel};
use crate::cipher::{PayloadCipher, XChaChaCipher};
use crate::config::SyncConfig;
use crate::images::InMemoryImageStore;
use crate::session::RecoverySession;
use crate::store::InMemoryRecoveryStore;
use crate::sync::ChannelSync;
use crate::SymmetricKey;
use serde_json::{json, Value};
use std::sync::Arc;

pub const TEST_KEY: &str = "test-channel-key";
pub const TINY_PNG: &str = "data:image/png;base64,aGVsbG8=";

pub struct Harness {
    pub channel: InMemoryChannel,
    pub images: InMemoryImageStore,
    pub store: InMemoryRecoveryStore,
    pub cipher: XChaChaCipher,
    pub session: RecoverySession,
    pub sync: ChannelSync,
}

impl Harness {
    pub fn new(identity: &str) -> Self {
        Self::with_config(identity, SyncConfig::default())
    }

    pub fn with_config(identity: &str, config: SyncConfig) -> Self {
        let channel = InMemoryChannel::new();
        let images = InMemoryImageStore::new();
        let store = InMemoryRecoveryStore::new();
        let cipher = XChaChaCipher::new();
        let key = SymmetricKey::new(TEST_KEY).expect("key");
        let session = RecoverySession::new(identity, key).expect("session");
        let sync = ChannelSync::new(
            Arc::new(channel.clone()),
            Arc::new(cipher),
            Arc::new(images.clone()),
            Arc::new(store.clone()),
            config,
        );
        Self {
            channel,
            images,
            store,
            cipher,
            session,
            sync,
        }
    }

    /// Another sync engine over the same channel, store and session.
    pub fn second_engine(&self) -> ChannelSync {
        ChannelSync::new(
            Arc::new(self.channel.clone()),
            Arc::new(self.cipher),
            Arc::new(self.images.clone()),
            Arc::new(self.store.clone()),
            SyncConfig::default(),
        )
    }

    pub async fn put_raw(&self, data_id: &str, bytes: Vec<u8>) {
        self.channel
            .upload(self.session.channel_id(), data_id, bytes)
            .await
            .expect("upload");
    }

    pub async fn put_plain(&self, data_id: &str, plaintext: &[u8]) {
        let sealed = self
            .cipher
            .encrypt(plaintext, self.session.key())
            .expect("encrypt");
        self.put_raw(data_id, sealed).await;
    }

    pub async fn put_json(&self, data_id: &str, value: Value) {
        let bytes = serde_json::to_vec(&value).expect("json");
        self.put_plain(data_id, &bytes).await;
    }

    pub async fn manifest(&self) -> Vec<String> {
        self.channel
            .list(self.session.channel_id())
            .await
            .expect("list")
    }
}

pub fn connection_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "score": 90,
        "timestamp": 1_650_000_000_000u64
    })
}

pub fn group_json(id: &str) -> Value {
    json!({
        "id": id,
        "aesKey": format!("{}-key", id),
        "name": format!("group {}", id),
        "members": ["A", "B"]
    })
}

pub fn profile_json(signing_key: &str, name: &str) -> Value {
    json!({
        "signingKey": signing_key,
        "timestamp": 1_650_000_000_000u64,
        "name": name
    })
}
