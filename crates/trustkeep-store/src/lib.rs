//! Trust store backends for trustkeep.
//!
//! [`TrustStore`] picks a backend for the running platform:
//!
//! - **Darwin**: certificates come from the system keychains and trust
//!   policy from `security trust-settings-export`. Policies are read and
//!   written as XML property lists through [`codec`].
//! - **Linux**: the distribution CA bundle is both the certificate list and
//!   the trust configuration.
//! - **Applications**: `--app firefox` (and `chrome` on Linux) read an NSS
//!   database through `certutil`; snapshots go to a per-application
//!   subdirectory.
//!
//! All of them share the [`backups`] snapshot directory.

pub mod backend;
pub mod backups;
pub mod codec;
pub mod config;
pub mod scratch;
pub mod utility;

#[cfg(test)]
mod test_support;

pub use backend::{DarwinStore, GeneratedPolicy, LinuxStore, NssStore, TrustStore};
pub use backups::{BackupDirectory, Snapshot};
pub use config::{App, Platform, StoreConfig};
pub use utility::{Certutil, NssUtility, SecurityCli, TrustUtility};
