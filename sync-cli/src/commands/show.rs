//! Show the reconciled count.

use anyhow::Result;

use super::Session;
use crate::config::DeviceContext;

/// Run the show command.
pub async fn run(ctx: &DeviceContext) -> Result<i64> {
    let session = Session::start(ctx, false, None).await?;
    let count = session.handle.current().await?;
    session.finish().await?;

    println!("{}: {}", ctx.role, count);
    Ok(count)
}
