pub mod channel;
pub mod cipher;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod images;
pub mod session;
pub mod store;
pub mod sync;

pub use channel::{channel_id_for_key, ChannelId, ChannelTransport, InMemoryChannel};
pub use cipher::{PayloadCipher, SymmetricKey, XChaChaCipher};
pub use config::SyncConfig;
pub use error::{DecodeError, SyncError};
pub use images::{FsImageStore, ImageStore, InMemoryImageStore};
pub use session::{RecoveryProgress, RecoverySession};
pub use store::{InMemoryRecoveryStore, RecoveryStore};
pub use sync::{ChannelSync, PollSummary, SkippedItem, SyncReport};

#[cfg(test)]
mod tests;
