//! trustkeep - system trust store manager

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    trustkeep_cli::run().await
}
