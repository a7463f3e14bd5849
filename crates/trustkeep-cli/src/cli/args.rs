//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Back up, inspect and trim the system certificate trust store
///
/// Take a backup before changing anything: `trustkeep backup`.
#[derive(Parser, Debug)]
#[command(name = "trustkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (default: platform config directory)
    #[arg(short, long, env = "TRUSTKEEP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Snapshot the current trust configuration into the backup directory
    Backup(BackupArgs),

    /// List trusted certificates
    List(ListArgs),

    /// Restore a snapshot (the latest one unless --file is given)
    Restore(RestoreArgs),

    /// Generate a trust policy that keeps only whitelisted certificates
    Whitelist(WhitelistArgs),

    /// Apply a policy previously generated by `whitelist`
    Apply(ApplyArgs),
}

impl Commands {
    /// Application named by `--app`, if the command takes one.
    pub fn app(&self) -> Option<&str> {
        match self {
            Self::Backup(args) => args.app.as_deref(),
            Self::List(args) => args.app.as_deref(),
            Self::Restore(args) => args.app.as_deref(),
            Self::Whitelist(_) | Self::Apply(_) => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Back up an application's store instead (firefox, chrome)
    #[arg(long)]
    pub app: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only print how many certificates are trusted
    #[arg(long)]
    pub count: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// List an application's store instead (firefox, chrome)
    #[arg(long)]
    pub app: Option<String>,
}

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Snapshot file to restore
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Restore an application's store instead (firefox, chrome)
    #[arg(long)]
    pub app: Option<String>,
}

#[derive(Args, Debug)]
pub struct WhitelistArgs {
    /// JSON whitelist: {"fingerprints": ["<sha1 hex>", ...]}
    #[arg(short, long)]
    pub file: PathBuf,

    /// Apply the generated policy right away
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Policy file produced by `whitelist`
    pub path: PathBuf,
}
