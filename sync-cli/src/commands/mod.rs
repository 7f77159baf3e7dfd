//! CLI command implementations.

pub mod counter;
pub mod settings;
pub mod show;
pub mod watch;

use anyhow::{Context, Result};
use clicker_sync_client::{
    CoordinatorHandle, JsonFileStore, SharedDirChannel, SyncCoordinator,
};
use tokio::task::JoinHandle;

use crate::config::DeviceContext;

/// A running coordinator for one command invocation.
pub struct Session {
    /// Handle to the coordinator.
    pub handle: CoordinatorHandle,
    task: JoinHandle<()>,
}

impl Session {
    /// Start a coordinator over this device's store and the shared channel.
    ///
    /// `observer`, if given, sees the initial value and every change.
    pub async fn start(
        ctx: &DeviceContext,
        poll: bool,
        observer: Option<Box<dyn FnMut(i64) + Send>>,
    ) -> Result<Self> {
        let channel: SharedDirChannel = ctx.channel(poll).await?;
        let store: JsonFileStore = ctx.store();
        let (mut coordinator, handle) =
            SyncCoordinator::new(ctx.config.coordinator_config(), store, channel);
        if let Some(observer) = observer {
            coordinator.subscribe(observer);
        }
        let task = coordinator.start();
        Ok(Self { handle, task })
    }

    /// Stop the coordinator and wait for it to finish.
    pub async fn finish(self) -> Result<()> {
        // Already stopped is fine: the task result below is what matters.
        let _ = self.handle.shutdown().await;
        self.task.await.context("Coordinator task failed")
    }
}
