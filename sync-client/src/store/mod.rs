//! Local persistence for the counter and settings.
//!
//! The store is a plain key/value collaborator: it holds serialized
//! snapshots, never the authoritative counter.
//!
//! - [`MemoryStore`] keeps everything in memory and can inject failures
//! - [`JsonFileStore`] keeps one JSON object file in a data directory

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use clicker_sync_types::Payload;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value under a key is not a payload object.
    #[error("corrupt entry for key {0:?}")]
    CorruptEntry(String),

    /// Write rejected by the backend.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Read rejected by the backend.
    #[error("read failed: {0}")]
    ReadFailed(String),
}

/// Key/value persistence for payloads.
///
/// Keys are opaque strings that stay stable across restarts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the payload stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Payload>, StoreError>;

    /// Replace the payload stored under `key`.
    async fn put(&self, key: &str, payload: Payload) -> Result<(), StoreError>;
}
