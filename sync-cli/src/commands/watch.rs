//! Follow the count as both devices change it.

use anyhow::{Context, Result};
use std::time::Duration;

use super::Session;
use crate::config::DeviceContext;

/// Run the watch command.
///
/// Prints the count at startup and after every change, until Ctrl-C or
/// until `duration` elapses.
pub async fn run(ctx: &DeviceContext, duration: Option<Duration>) -> Result<()> {
    let role = ctx.role;
    let printer: Box<dyn FnMut(i64) + Send> =
        Box::new(move |count: i64| println!("{}: {}", role, count));
    let session = Session::start(ctx, true, Some(printer)).await?;

    tracing::info!(
        "Watching {} (peer file {})",
        ctx.shared_dir.display(),
        role.peer()
    );

    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?,
    }

    session.finish().await
}
