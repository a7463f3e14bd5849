//! Whitelist capability consumed by `remove`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::certificate::Certificate;
use crate::error::{Result, TrustError};
use crate::fingerprint::Fingerprint;

/// Selects the certificates that should remain trusted.
pub trait Whitelist {
    fn matches(&self, cert: &Certificate) -> bool;
}

impl<F> Whitelist for F
where
    F: Fn(&Certificate) -> bool,
{
    fn matches(&self, cert: &Certificate) -> bool {
        self(cert)
    }
}

/// A whitelist of exact fingerprints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintWhitelist {
    #[serde(default)]
    pub fingerprints: HashSet<Fingerprint>,
}

impl FingerprintWhitelist {
    /// Load from a JSON file of the form `{"fingerprints": ["AB12...", ...]}`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TrustError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| TrustError::decode(format!("whitelist {}: {e}", path.display())))
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl Whitelist for FingerprintWhitelist {
    fn matches(&self, cert: &Certificate) -> bool {
        self.fingerprints.contains(cert.fingerprint())
    }
}

impl FromIterator<Fingerprint> for FingerprintWhitelist {
    fn from_iter<I: IntoIterator<Item = Fingerprint>>(iter: I) -> Self {
        Self {
            fingerprints: iter.into_iter().collect(),
        }
    }
}
