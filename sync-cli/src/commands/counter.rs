//! Increment, decrement and reset the counter.

use anyhow::Result;
use clicker_sync_client::load_settings;

use super::Session;
use crate::config::DeviceContext;

/// A local change to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Increment by the multiplier, or the stored default.
    Increment(Option<i64>),
    /// Decrement by the multiplier, or the stored default.
    Decrement(Option<i64>),
    /// Reset to zero.
    Reset,
}

/// Run a counter command. Returns the new count.
///
/// If the change could not be persisted or published it is still kept on
/// this device; the count is printed before the error is returned.
pub async fn run(ctx: &DeviceContext, change: Change) -> Result<i64> {
    let multiplier = match change {
        Change::Increment(Some(m)) | Change::Decrement(Some(m)) => m,
        Change::Increment(None) | Change::Decrement(None) => {
            load_settings(&ctx.store(), ctx.settings_key())
                .await
                .increments_multiples
        }
        Change::Reset => 0,
    };

    let session = Session::start(ctx, false, None).await?;
    let result = match change {
        Change::Increment(_) => session.handle.increment(multiplier).await,
        Change::Decrement(_) => session.handle.decrement(multiplier).await,
        Change::Reset => session.handle.reset().await,
    };
    session.finish().await?;

    match result {
        Ok(count) => {
            println!("{}: {}", ctx.role, count);
            Ok(count)
        }
        Err(e) => match e.kept_count() {
            Some(count) => {
                println!("{}: {} (not synced)", ctx.role, count);
                Err(anyhow::Error::new(e).context("Change kept on this device only"))
            }
            None => Err(e.into()),
        },
    }
}
