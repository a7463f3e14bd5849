//! `trustkeep list` - Show trusted certificates.

use anyhow::Result;

use super::Context;
use crate::cli::args::ListArgs;
use crate::output::{print_certificates, print_count};

pub async fn execute(ctx: Context, args: ListArgs) -> Result<()> {
    let format = args.format.unwrap_or(ctx.output_format);
    let certs = ctx.store.list().await?;

    if args.count {
        print_count(certs.len(), format);
    } else {
        print_certificates(&certs, format)?;
    }
    Ok(())
}
