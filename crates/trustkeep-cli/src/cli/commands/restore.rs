//! `trustkeep restore` - Put a snapshot back in place.

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;
use crate::cli::args::RestoreArgs;

pub async fn execute(ctx: Context, args: RestoreArgs) -> Result<()> {
    let restored = ctx
        .store
        .restore(args.file.as_deref())
        .await
        .context("restore failed")?;

    println!(
        "{} restored {}",
        "Success:".green().bold(),
        restored.display().to_string().cyan()
    );
    Ok(())
}
