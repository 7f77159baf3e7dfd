//! Configuration for the clicker CLI.
//!
//! Loaded from a TOML file (default: `clicker.toml` in the data directory).
//! Every field has a default, so the file and each section are optional.

use anyhow::{Context, Result};
use clicker_sync_client::{CoordinatorConfig, DeviceRole, JsonFileStore, SharedDirChannel};
use clicker_sync_types::SETTINGS_KEY;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the config file inside the data directory.
pub const CONFIG_FILE: &str = "clicker.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity.
    pub device: DeviceSection,
    /// Coordinator settings.
    pub sync: SyncSection,
    /// Context channel settings.
    pub channel: ChannelSection,
    /// Logging settings.
    pub logging: LoggingSection,
}

/// Device identity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeviceSection {
    /// Which end of the pair this device is (default: primary).
    pub role: DeviceRole,
}

/// Coordinator settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Store and wire key for the counter (default: "clicker").
    pub counter_key: String,
    /// Store key for settings (default: "settings").
    pub settings_key: String,
    /// Queue capacity (default: 64).
    pub queue_capacity: usize,
    /// Amount one multiplier unit moves the counter (default: 1).
    pub increment_step: i64,
}

impl Default for SyncSection {
    fn default() -> Self {
        let defaults = CoordinatorConfig::default();
        Self {
            counter_key: defaults.counter_key,
            settings_key: SETTINGS_KEY.to_string(),
            queue_capacity: defaults.queue_capacity,
            increment_step: defaults.increment_step,
        }
    }
}

/// Context channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Directory shared with the peer (default: `<data_dir>/../shared`).
    pub shared_dir: Option<PathBuf>,
    /// How often `watch` re-reads the peer file (default: 500ms).
    pub poll_interval_ms: u64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            shared_dir: None,
            poll_interval_ms: 500,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is unset (default: "warn").
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields the defaults unless `required` is set.
    pub async fn load(path: &Path, required: bool) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("Invalid configuration in {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read configuration {}", path.display())),
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Coordinator configuration derived from the `[sync]` section.
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_counter_key(&self.sync.counter_key)
            .with_queue_capacity(self.sync.queue_capacity)
            .with_increment_step(self.sync.increment_step)
    }
}

/// Everything a command needs to reach this device's state and its peer.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    /// Directory holding this device's state file.
    pub data_dir: PathBuf,
    /// Directory shared with the peer.
    pub shared_dir: PathBuf,
    /// This device's role.
    pub role: DeviceRole,
    /// Loaded configuration.
    pub config: Config,
}

impl DeviceContext {
    /// Combine configuration with command-line overrides.
    pub fn resolve(
        data_dir: PathBuf,
        shared_dir: Option<PathBuf>,
        role: Option<DeviceRole>,
        config: Config,
    ) -> Self {
        let shared_dir = shared_dir
            .or_else(|| config.channel.shared_dir.clone())
            .unwrap_or_else(|| default_shared_dir(&data_dir));
        let role = role.unwrap_or(config.device.role);
        Self {
            data_dir,
            shared_dir,
            role,
            config,
        }
    }

    /// The local state store.
    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.data_dir)
    }

    /// Open the context channel, optionally polling the peer for updates.
    pub async fn channel(&self, poll: bool) -> Result<SharedDirChannel> {
        let channel = SharedDirChannel::open(&self.shared_dir, self.role)
            .await
            .with_context(|| {
                format!("Failed to open shared directory {}", self.shared_dir.display())
            })?;
        Ok(if poll {
            channel.with_poll_interval(Duration::from_millis(
                self.config.channel.poll_interval_ms.max(1),
            ))
        } else {
            channel
        })
    }

    /// Store key for settings.
    pub fn settings_key(&self) -> &str {
        &self.config.sync.settings_key
    }
}

/// `<data_dir>/../shared`, or `<data_dir>/shared` at the filesystem root.
fn default_shared_dir(data_dir: &Path) -> PathBuf {
    match data_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("shared"),
        _ => data_dir.join("shared"),
    }
}
