//! # trustkeep-cli
//!
//! Command-line front end for the trustkeep trust store manager.
//!
//! ## Commands
//!
//! - **backup**: snapshot the trust configuration
//! - **list**: show trusted certificates (`--count`, `--format json`)
//! - **restore**: put the latest (or a named) snapshot back
//! - **whitelist**: generate a policy keeping only listed fingerprints
//! - **apply**: import a generated policy

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
