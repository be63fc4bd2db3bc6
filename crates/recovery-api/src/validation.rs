use crate::types::*;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty field {0}")]
    Empty(&'static str),
    #[error("missing field {0}")]
    Missing(&'static str),
}

pub fn validate_connection(payload: &ConnectionPayload) -> Result<(), ValidationError> {
    if payload.id.trim().is_empty() {
        return Err(ValidationError::Empty("id"));
    }
    if payload.name.trim().is_empty() {
        return Err(ValidationError::Empty("name"));
    }
    Ok(())
}

pub fn validate_group(payload: &GroupPayload) -> Result<(), ValidationError> {
    if payload.id.trim().is_empty() {
        return Err(ValidationError::Empty("id"));
    }
    if payload.aes_key.is_empty() {
        return Err(ValidationError::Empty("aesKey"));
    }
    Ok(())
}

/// Bootstrap needs the signing key and upload timestamp; name and photo are
/// optional and handled by the profile sync.
pub fn validate_bootstrap(payload: &ProfilePayload) -> Result<(), ValidationError> {
    if payload.signing_key.trim().is_empty() {
        return Err(ValidationError::Empty("signingKey"));
    }
    if payload.timestamp == 0 {
        return Err(ValidationError::Missing("timestamp"));
    }
    Ok(())
}

pub fn validate_profile(payload: &ProfilePayload) -> Result<(), ValidationError> {
    if payload.signing_key.trim().is_empty() {
        return Err(ValidationError::Empty("signingKey"));
    }
    match payload.name.as_deref() {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::Empty("name")),
    }
}
