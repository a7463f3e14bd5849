//! `trustkeep backup` - Snapshot the trust configuration.

use anyhow::{Context as _, Result};

use super::Context;

pub async fn execute(ctx: Context) -> Result<()> {
    let snapshot = ctx
        .store
        .backup()
        .await
        .context("backup failed")?;

    if ctx.verbose {
        eprintln!("Snapshot: {}", snapshot.display());
    }
    println!("Backup completed successfully");
    Ok(())
}
