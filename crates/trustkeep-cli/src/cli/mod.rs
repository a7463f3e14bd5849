//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trustkeep_store::TrustStore;

use crate::config::Config;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_logging(cli.verbose, config.store.verbose_counts);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let store = match cli.command.app() {
        Some(app) => TrustStore::for_app(app, &config.store)?,
        None => TrustStore::from_config(&config.store)?,
    };
    tracing::debug!(backend = store.name(), "trust store ready");

    let ctx = commands::Context {
        store,
        output_format: config.output_format.unwrap_or_default(),
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Backup(_) => commands::backup::execute(ctx).await,
        Commands::List(args) => commands::list::execute(ctx, args).await,
        Commands::Restore(args) => commands::restore::execute(ctx, args).await,
        Commands::Whitelist(args) => commands::whitelist::execute(ctx, args).await,
        Commands::Apply(args) => commands::apply::execute(ctx, args).await,
    }
}

/// Logs go to stderr so stdout stays parseable.
///
/// `RUST_LOG` wins when set; otherwise `-v` means debug and `verbose_counts`
/// lifts the floor to info so the counts are visible.
fn init_logging(verbose: bool, verbose_counts: bool) {
    let fallback = if verbose {
        "debug"
    } else if verbose_counts {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
