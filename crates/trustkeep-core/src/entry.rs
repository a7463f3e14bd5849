//! Trust policy rows.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::certificate::{Certificate, DistinguishedName};
use crate::fingerprint::Fingerprint;

/// Value of `kSecTrustSettingsResult` attached to a policy entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustResult {
    Invalid,
    TrustRoot,
    TrustAsRoot,
    Deny,
    Unspecified,
    /// A code this crate does not know about, preserved verbatim.
    Other(i64),
}

impl TrustResult {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Invalid => 0,
            Self::TrustRoot => 1,
            Self::TrustAsRoot => 2,
            Self::Deny => 3,
            Self::Unspecified => 4,
            Self::Other(code) => code,
        }
    }
}

impl From<i64> for TrustResult {
    fn from(code: i64) -> Self {
        match code {
            0 => Self::Invalid,
            1 => Self::TrustRoot,
            2 => Self::TrustAsRoot,
            3 => Self::Deny,
            4 => Self::Unspecified,
            other => Self::Other(other),
        }
    }
}

/// One row of trust policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustEntry {
    pub fingerprint: Fingerprint,
    pub issuer: DistinguishedName,
    /// Last modification; the policy format keeps whole seconds only
    pub modified: DateTime<Utc>,
    /// Serial number, minimal big-endian
    pub serial: Vec<u8>,
    pub trust_result: Option<TrustResult>,
}

impl TrustEntry {
    /// Build a fresh entry for a certificate that should stay trusted.
    #[must_use]
    pub fn from_certificate(cert: &Certificate, modified: DateTime<Utc>) -> Self {
        Self {
            fingerprint: cert.fingerprint().clone(),
            issuer: cert.issuer().clone(),
            modified,
            serial: cert.serial().to_vec(),
            trust_result: None,
        }
    }
}

impl fmt::Display for TrustEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SHA1 Fingerprint: {}\n {}\n modDate: {}\n serialNumber: {}",
            self.fingerprint,
            self.issuer,
            self.modified.format("%Y-%m-%dT%H:%M:%SZ"),
            hex::encode(&self.serial)
        )
    }
}

/// The decoded set of entries from a policy document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustEntries(Vec<TrustEntry>);

impl TrustEntries {
    #[must_use]
    pub const fn new(entries: Vec<TrustEntry>) -> Self {
        Self(entries)
    }

    /// Whether the policy lists this certificate.
    ///
    /// An absent certificate is reported as contained. Callers building a
    /// kept set must skip absent certificates themselves.
    #[must_use]
    pub fn contains(&self, cert: Option<&Certificate>) -> bool {
        let Some(cert) = cert else {
            return true;
        };
        self.0.iter().any(|e| &e.fingerprint == cert.fingerprint())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrustEntry> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<TrustEntry> {
        self.0
    }
}

impl From<Vec<TrustEntry>> for TrustEntries {
    fn from(entries: Vec<TrustEntry>) -> Self {
        Self(entries)
    }
}

impl FromIterator<TrustEntry> for TrustEntries {
    fn from_iter<I: IntoIterator<Item = TrustEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
