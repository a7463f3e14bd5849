//! Command implementations.

pub mod apply;
pub mod backup;
pub mod list;
pub mod restore;
pub mod whitelist;

use trustkeep_store::TrustStore;

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// The platform trust store, or the one named by `--app`
    pub store: TrustStore,

    /// Output format when a command does not override it
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,
}
