//! Context channel over a directory both devices can see.
//!
//! Each device writes its outgoing context to `<dir>/<role>.json` and reads
//! the peer's file as its received context. Useful for demos and for running
//! both devices on one machine.
//!
//! The received context is cached in memory, so snapshot pulls never touch
//! the disk. With a poll interval set, a background task re-reads the peer
//! file and delivers each new context to the registered sink.

use super::{ChannelError, ContextChannel, RemoteUpdateSink};
use async_trait::async_trait;
use clicker_sync_types::{context_entry, wrap_context, ApplicationContext, Payload};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Which end of the pair this device is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    /// The primary device (phone).
    #[default]
    Primary,
    /// The companion device (watch).
    Companion,
}

impl DeviceRole {
    /// The other end of the pair.
    pub fn peer(self) -> Self {
        match self {
            Self::Primary => Self::Companion,
            Self::Companion => Self::Primary,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Companion => "companion",
        }
    }

    fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "companion" => Ok(Self::Companion),
            other => Err(format!(
                "unknown role {other:?} (expected primary or companion)"
            )),
        }
    }
}

/// Context channel backed by a shared directory.
#[derive(Debug)]
pub struct SharedDirChannel {
    outbox: PathBuf,
    inbox: PathBuf,
    received: Arc<Mutex<Option<ApplicationContext>>>,
    poll_interval: Option<Duration>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl SharedDirChannel {
    /// Open the channel for `role` in `dir`, loading whatever the peer last
    /// wrote. The directory is created if needed.
    pub async fn open(dir: impl AsRef<Path>, role: DeviceRole) -> Result<Self, ChannelError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let inbox = dir.join(role.peer().file_name());
        let received = match read_context(&inbox).await {
            Ok(received) => received,
            Err(ChannelError::Serialization(e)) => {
                tracing::warn!(
                    "Ignoring unreadable peer context {}: {}",
                    inbox.display(),
                    e
                );
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            outbox: dir.join(role.file_name()),
            inbox,
            received: Arc::new(Mutex::new(received)),
            poll_interval: None,
            poller: Mutex::new(None),
        })
    }

    /// Poll the peer file every `interval` once a sink is registered.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Path this device publishes to.
    pub fn outbox(&self) -> &Path {
        &self.outbox
    }
}

#[async_trait]
impl ContextChannel for SharedDirChannel {
    fn current_remote_snapshot(&self, key: &str) -> Option<Payload> {
        let received = self.received.lock().unwrap();
        context_entry(received.as_ref()?, key)?.ok().cloned()
    }

    async fn publish(&self, key: &str, payload: Payload) -> Result<(), ChannelError> {
        let contents = serde_json::to_string_pretty(&wrap_context(key, payload))?;
        let tmp = self.outbox.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.outbox).await?;
        Ok(())
    }

    fn on_remote_update(&self, sink: RemoteUpdateSink) {
        let Some(interval) = self.poll_interval else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime, peer file polling disabled");
            return;
        };

        let inbox = self.inbox.clone();
        let received = Arc::clone(&self.received);
        let task = runtime.spawn(poll_peer(inbox, received, interval, sink));

        if let Some(previous) = self.poller.lock().unwrap().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for SharedDirChannel {
    fn drop(&mut self) {
        if let Some(task) = self.poller.lock().unwrap().take() {
            task.abort();
        }
    }
}

/// Re-read the peer file on every tick and deliver contexts that changed.
async fn poll_peer(
    inbox: PathBuf,
    received: Arc<Mutex<Option<ApplicationContext>>>,
    interval: Duration,
    sink: RemoteUpdateSink,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let context = match read_context(&inbox).await {
            Ok(Some(context)) => context,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!("Failed to read peer context {}: {}", inbox.display(), e);
                continue;
            }
        };

        let changed = {
            let mut cached = received.lock().unwrap();
            if cached.as_ref() == Some(&context) {
                false
            } else {
                *cached = Some(context.clone());
                true
            }
        };

        if changed && sink.deliver(context).await.is_err() {
            tracing::debug!("Remote update queue closed, stopping peer poll");
            break;
        }
    }
}

/// Read an application context file. A missing file is `None`.
async fn read_context(path: &Path) -> Result<Option<ApplicationContext>, ChannelError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
