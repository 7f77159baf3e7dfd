//! # sync-client
//!
//! Keeps a clicker counter consistent between two devices.
//!
//! ## Features
//!
//! - **Single-writer coordinator**: [`SyncCoordinator`] owns the authoritative
//!   counter on one tokio task; everything else talks to it via
//!   [`CoordinatorHandle`] or the [`RemoteUpdateSink`] queue
//! - **Collaborator abstraction**: pluggable [`StateStore`] (memory, JSON
//!   file) and [`ContextChannel`] (mock, shared directory)
//! - **Pure State Machine**: uses sync-core for reconciliation and ordering
//!
//! ## Example
//!
//! ```ignore
//! use clicker_sync_client::{CoordinatorConfig, MemoryStore, MockContextChannel, SyncCoordinator};
//!
//! let (mut coordinator, handle) =
//!     SyncCoordinator::new(CoordinatorConfig::default(), MemoryStore::new(), MockContextChannel::new());
//! coordinator.subscribe(|count| println!("count is now {count}"));
//! let task = coordinator.start();
//!
//! handle.increment(1).await?;
//! handle.shutdown().await?;
//! task.await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod coordinator;
pub mod settings;
pub mod store;

pub use channel::{
    ChannelError, ContextChannel, DeviceRole, MockContextChannel, RemoteUpdateSink,
    SharedDirChannel,
};
pub use coordinator::{CoordinatorConfig, CoordinatorError, CoordinatorHandle, SyncCoordinator};
pub use settings::{load_settings, save_settings};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
