use recovery_api::validation::ValidationError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("not found")]
    NotFound,
    #[error("transport {0}")]
    Transport(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key")]
    InvalidKey,
    #[error("encoding")]
    Encoding,
    #[error("decryption failed")]
    Decryption,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image name {0}")]
    InvalidName(String),
    #[error("invalid image data")]
    InvalidData,
    #[error("image too large")]
    TooLarge,
    #[error("io {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("empty identity")]
    EmptyIdentity,
    #[error("empty symmetric key")]
    EmptyKey,
}

/// Why a single manifest item produced no record. Never fatal to a batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("item unavailable: {0}")]
    Unavailable(ChannelError),
    #[error("item fetch timed out")]
    Timeout,
    #[error("item undecryptable: {0}")]
    Undecryptable(CipherError),
    #[error("item malformed: {0}")]
    Malformed(String),
    #[error("missing data: {0}")]
    MissingData(ValidationError),
    #[error("payload id {found} does not match {expected}")]
    KeyMismatch { expected: String, found: String },
    #[error("image: {0}")]
    Image(ImageError),
}

/// Failures that abort a whole sync call.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("manifest unreadable: {0}")]
    Manifest(ChannelError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("channel data incomplete or malformed: {0}")]
    BadChannelData(DecodeError),
}
