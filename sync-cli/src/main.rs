//! # clicker
//!
//! Command-line clicker that stays in sync with a paired device.
//!
//! ## Commands
//!
//! - `show`: Reconcile with the peer and print the count
//! - `inc` / `dec`: Change the count and send it to the peer
//! - `reset`: Set the count to zero
//! - `settings`: Show or change local settings
//! - `watch`: Print the count whenever either device changes it
//!
//! ## Example
//!
//! ```bash
//! # Phone and watch share a directory
//! clicker --data-dir /tmp/phone --shared-dir /tmp/shared inc --by 3
//! clicker --data-dir /tmp/watch --shared-dir /tmp/shared --role companion show
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clicker_sync_client::DeviceRole;
use clicker_sync_types::ClickerColor;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::counter::Change;
use commands::{counter, settings, show, watch};
use config::{Config, DeviceContext, CONFIG_FILE};

/// Command-line clicker that stays in sync with a paired device.
#[derive(Parser, Debug)]
#[command(name = "clicker")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Data directory for this device's stored state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory shared with the peer device
    #[arg(long, global = true)]
    shared_dir: Option<PathBuf>,

    /// Which end of the pair this device is (primary or companion)
    #[arg(long, global = true)]
    role: Option<DeviceRole>,

    /// Configuration file (default: <data-dir>/clicker.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile with the peer and print the count
    Show,

    /// Increment the count
    Inc {
        /// Multiplier (default: the stored increment multiple)
        #[arg(long, allow_negative_numbers = true)]
        by: Option<i64>,
    },

    /// Decrement the count
    Dec {
        /// Multiplier (default: the stored increment multiple)
        #[arg(long, allow_negative_numbers = true)]
        by: Option<i64>,
    },

    /// Reset the count to zero
    Reset,

    /// Show or change local settings
    Settings {
        /// Display color (red, orange, yellow, green, blue, purple)
        #[arg(long)]
        color: Option<ClickerColor>,

        /// Default multiplier for inc/dec
        #[arg(long, allow_negative_numbers = true)]
        multiple: Option<i64>,
    },

    /// Print the count whenever either device changes it
    Watch {
        /// Stop after this many milliseconds instead of waiting for Ctrl-C
        #[arg(long)]
        for_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine data directory
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };

    let config = match cli.config {
        Some(path) => Config::load(&path, true).await?,
        None => Config::load(&data_dir.join(CONFIG_FILE), false).await?,
    };

    init_logging(&config.logging.level);

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    let ctx = DeviceContext::resolve(data_dir, cli.shared_dir, cli.role, config);

    match cli.command {
        Commands::Show => {
            show::run(&ctx).await?;
        }
        Commands::Inc { by } => {
            counter::run(&ctx, Change::Increment(by)).await?;
        }
        Commands::Dec { by } => {
            counter::run(&ctx, Change::Decrement(by)).await?;
        }
        Commands::Reset => {
            counter::run(&ctx, Change::Reset).await?;
        }
        Commands::Settings { color, multiple } => {
            settings::run(&ctx, color, multiple).await?;
        }
        Commands::Watch { for_ms } => {
            watch::run(&ctx, for_ms.map(Duration::from_millis)).await?;
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` or the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Get the default data directory for clicker.
fn default_data_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("io", "clicker", "clicker")
        .context("Could not determine home directory")?;
    Ok(dirs.data_dir().to_path_buf())
}
