//! Context channel to the peer device.
//!
//! The channel carries *application contexts*: small mappings of wire key to
//! payload. It offers three things:
//! - `current_remote_snapshot()` pulls the last context already received
//! - `publish()` sends our payload to the peer, best effort
//! - `on_remote_update()` registers the [`RemoteUpdateSink`] that receives
//!   every context the peer delivers later
//!
//! Deliveries may originate on any task or thread. They are never applied
//! directly: the sink forwards them over a bounded queue to the coordinator,
//! which applies them one at a time in arrival order.

mod mock;
mod shared_dir;

pub use mock::MockContextChannel;
pub use shared_dir::{DeviceRole, SharedDirChannel};

use async_trait::async_trait;
use clicker_sync_types::{ApplicationContext, Payload};
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer cannot be reached right now.
    #[error("peer unreachable")]
    PeerUnreachable,

    /// Publish rejected by the channel.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The coordinator is no longer accepting remote updates.
    #[error("remote update queue closed")]
    Closed,

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Context could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bidirectional context exchange with the peer device.
#[async_trait]
pub trait ContextChannel: Send + Sync {
    /// Payload under `key` in the last context received from the peer.
    ///
    /// Must not block on the network: this is a read of cached state.
    fn current_remote_snapshot(&self, key: &str) -> Option<Payload>;

    /// Send `payload` to the peer as the context `{key: payload}`.
    async fn publish(&self, key: &str, payload: Payload) -> Result<(), ChannelError>;

    /// Register where future peer deliveries go. Called once at startup.
    fn on_remote_update(&self, sink: RemoteUpdateSink);
}

/// Entry point of the coordinator's remote-update queue.
///
/// Cloneable and `Send`; hand it to whatever task or thread receives peer
/// messages.
#[derive(Debug, Clone)]
pub struct RemoteUpdateSink {
    tx: mpsc::Sender<ApplicationContext>,
}

impl RemoteUpdateSink {
    /// Wrap the sending half of a remote-update queue.
    pub fn new(tx: mpsc::Sender<ApplicationContext>) -> Self {
        Self { tx }
    }

    /// Queue a delivered context, waiting for room if the queue is full.
    pub async fn deliver(&self, context: ApplicationContext) -> Result<(), ChannelError> {
        self.tx.send(context).await.map_err(|_| ChannelError::Closed)
    }

    /// Queue a delivered context from a thread outside the tokio runtime.
    ///
    /// Panics if called from within an async execution context, like
    /// [`mpsc::Sender::blocking_send`].
    pub fn blocking_deliver(&self, context: ApplicationContext) -> Result<(), ChannelError> {
        self.tx.blocking_send(context).map_err(|_| ChannelError::Closed)
    }

    /// Whether the coordinator has stopped receiving.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
