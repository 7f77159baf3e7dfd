//! Show or update local settings.

use anyhow::{Context, Result};
use clicker_sync_client::{load_settings, save_settings};
use clicker_sync_types::{ClickerColor, Settings};

use crate::config::DeviceContext;

/// Run the settings command. Settings stay on this device.
pub async fn run(
    ctx: &DeviceContext,
    color: Option<ClickerColor>,
    multiple: Option<i64>,
) -> Result<Settings> {
    let store = ctx.store();
    let mut settings = load_settings(&store, ctx.settings_key()).await;

    if color.is_some() || multiple.is_some() {
        if let Some(color) = color {
            settings.color = color;
        }
        if let Some(multiple) = multiple {
            settings.increments_multiples = multiple;
        }
        save_settings(&store, ctx.settings_key(), &settings)
            .await
            .context("Failed to save settings")?;
    }

    println!("Settings:");
    println!("  Color:    {}", settings.color);
    println!("  Multiple: {}", settings.increments_multiples);
    Ok(settings)
}
