//! Per-item fetch, decrypt, validate and image resolution.
//!
//! Every operation returns `Err(DecodeError)` instead of a record when the item
//! cannot be used; callers skip the item and carry on with the batch.

use crate::channel::{ChannelId, ChannelTransport};
use crate::cipher::{PayloadCipher, SymmetricKey};
use crate::config::SyncConfig;
use crate::error::{DecodeError, ImageError};
use crate::images::ImageStore;
use crate::session::RecoverySession;
use log::debug;
use recovery_api::data_id::DataId;
use recovery_api::types::{
    ConnectionPayload, ConnectionRecord, Cosignature, GroupPayload, GroupRecord, ProfilePayload,
    ProfileRecord, RecoveryBootstrap,
};
use recovery_api::validation::{
    validate_bootstrap, validate_connection, validate_group, validate_profile,
};
use serde::de::DeserializeOwned;

/// A decoded self profile together with the identity it claims to belong to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileCandidate {
    pub owner: String,
    pub profile: ProfileRecord,
}

pub struct EntityDecoder<'a> {
    channel: &'a dyn ChannelTransport,
    cipher: &'a dyn PayloadCipher,
    images: &'a dyn ImageStore,
    config: &'a SyncConfig,
    channel_id: &'a ChannelId,
    key: &'a SymmetricKey,
}

impl<'a> EntityDecoder<'a> {
    pub fn new(
        channel: &'a dyn ChannelTransport,
        cipher: &'a dyn PayloadCipher,
        images: &'a dyn ImageStore,
        config: &'a SyncConfig,
        session: &'a RecoverySession,
    ) -> Self {
        Self {
            channel,
            cipher,
            images,
            config,
            channel_id: session.channel_id(),
            key: session.key(),
        }
    }

    async fn fetch(&self, id: &DataId) -> Result<Vec<u8>, DecodeError> {
        let data_id = id.to_string();
        let download = self.channel.download(self.channel_id, &data_id);
        let encrypted = tokio::time::timeout(self.config.item_timeout(), download)
            .await
            .map_err(|_| DecodeError::Timeout)?
            .map_err(DecodeError::Unavailable)?;
        self.cipher
            .decrypt(&encrypted, self.key)
            .map_err(DecodeError::Undecryptable)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, id: &DataId) -> Result<T, DecodeError> {
        let plaintext = self.fetch(id).await?;
        serde_json::from_slice(&plaintext).map_err(|e| DecodeError::Malformed(e.to_string()))
    }

    async fn resolve_photo(
        &self,
        name: &str,
        photo: Option<String>,
    ) -> Result<Option<String>, DecodeError> {
        let photo = match photo {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Ok(None),
        };
        if photo.len() / 4 * 3 > self.config.max_photo_bytes {
            return Err(DecodeError::Image(ImageError::TooLarge));
        }
        let filename = self
            .images
            .persist(name, &photo)
            .await
            .map_err(DecodeError::Image)?;
        Ok(Some(filename))
    }

    fn check_key(id: &DataId, found: &str) -> Result<(), DecodeError> {
        if id.natural_key() != found {
            return Err(DecodeError::KeyMismatch {
                expected: id.natural_key().to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    pub async fn connection(&self, id: &DataId) -> Result<ConnectionRecord, DecodeError> {
        let payload: ConnectionPayload = self.fetch_json(id).await?;
        validate_connection(&payload).map_err(DecodeError::MissingData)?;
        Self::check_key(id, &payload.id)?;
        debug!("downloading profile data of connection {}", payload.id);
        let photo = self.resolve_photo(&payload.id, payload.photo).await?;
        Ok(ConnectionRecord {
            id: payload.id,
            name: payload.name,
            score: payload.score,
            photo,
            timestamp: payload.timestamp,
        })
    }

    pub async fn group(&self, id: &DataId) -> Result<GroupRecord, DecodeError> {
        let payload: GroupPayload = self.fetch_json(id).await?;
        validate_group(&payload).map_err(DecodeError::MissingData)?;
        Self::check_key(id, &payload.id)?;
        let photo = self.resolve_photo(&payload.id, payload.photo).await?;
        Ok(GroupRecord {
            id: payload.id,
            aes_key: payload.aes_key,
            photo,
            name: payload.name,
            members: payload.members,
            admins: payload.admins,
        })
    }

    pub async fn signature(&self, id: &DataId) -> Result<Cosignature, DecodeError> {
        self.fetch(id).await.map(Cosignature)
    }

    /// Reads a self profile from either the `data` bundle (owner is its signing
    /// key) or a connection card (owner is the card's id).
    pub async fn profile(&self, id: &DataId) -> Result<ProfileCandidate, DecodeError> {
        let (owner, name, photo) = match id {
            DataId::SelfProfile => {
                let payload: ProfilePayload = self.fetch_json(id).await?;
                validate_profile(&payload).map_err(DecodeError::MissingData)?;
                (payload.signing_key, payload.name.unwrap_or_default(), payload.photo)
            }
            DataId::Connection(_) => {
                let payload: ConnectionPayload = self.fetch_json(id).await?;
                validate_connection(&payload).map_err(DecodeError::MissingData)?;
                Self::check_key(id, &payload.id)?;
                (payload.id, payload.name, payload.photo)
            }
            other => {
                return Err(DecodeError::Malformed(format!(
                    "{} is not a profile source",
                    other
                )))
            }
        };
        let photo = self.resolve_photo(&owner, photo).await?;
        Ok(ProfileCandidate {
            owner,
            profile: ProfileRecord { name, photo },
        })
    }

    pub async fn bootstrap(&self) -> Result<RecoveryBootstrap, DecodeError> {
        let payload: ProfilePayload = self.fetch_json(&DataId::SelfProfile).await?;
        validate_bootstrap(&payload).map_err(DecodeError::MissingData)?;
        Ok(RecoveryBootstrap {
            signing_key: payload.signing_key,
            timestamp: payload.timestamp,
        })
    }
}
