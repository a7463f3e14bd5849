//! Core types for trustkeep.
//!
//! - **Identity**: [`Fingerprint`] is the SHA-1 of a certificate's signature
//!   bytes and is the only thing [`Certificate`] equality looks at
//! - **Policy rows**: [`TrustEntry`] and the decoded [`TrustEntries`] set
//! - **Whitelists**: the [`Whitelist`] capability consumed when trimming a store
//! - **Errors**: [`TrustError`] and the crate-wide [`Result`]

mod error;
pub mod certificate;
pub mod entry;
pub mod fingerprint;
pub mod whitelist;

pub use certificate::{dedup, parse_pem_stream, Certificate, DistinguishedName};
pub use entry::{TrustEntries, TrustEntry, TrustResult};
pub use error::{Result, TrustError};
pub use fingerprint::Fingerprint;
pub use whitelist::{FingerprintWhitelist, Whitelist};
