//! `trustkeep whitelist` - Generate a trimmed trust policy.

use anyhow::{Context as _, Result};
use colored::Colorize;

use trustkeep_core::FingerprintWhitelist;

use super::Context;
use crate::cli::args::WhitelistArgs;

pub async fn execute(ctx: Context, args: WhitelistArgs) -> Result<()> {
    let whitelist = FingerprintWhitelist::load(&args.file)
        .with_context(|| format!("loading whitelist {}", args.file.display()))?;
    if whitelist.is_empty() {
        anyhow::bail!(
            "Whitelist {} lists no fingerprints; refusing to generate an empty policy",
            args.file.display()
        );
    }

    let generated = ctx.store.remove(&whitelist).await?;
    println!(
        "Kept {}, dropped {}",
        generated.kept.to_string().green(),
        generated.dropped.to_string().yellow()
    );
    println!("Policy written to {}", generated.path.display().to_string().cyan());

    if args.apply {
        ctx.store.apply(&generated.path).await.context("apply failed")?;
        println!("{} policy applied", "Success:".green().bold());
    } else {
        println!(
            "{}",
            format!("Review it, then run: trustkeep apply {}", generated.path.display()).dimmed()
        );
    }
    Ok(())
}
