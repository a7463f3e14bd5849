//! `trustkeep apply` - Import a generated policy.

use anyhow::{Context as _, Result};
use colored::Colorize;

use super::Context;
use crate::cli::args::ApplyArgs;

pub async fn execute(ctx: Context, args: ApplyArgs) -> Result<()> {
    ctx.store
        .apply(&args.path)
        .await
        .with_context(|| format!("applying {}", args.path.display()))?;

    println!(
        "{} applied {}",
        "Success:".green().bold(),
        args.path.display().to_string().cyan()
    );
    Ok(())
}
