//! Certificate fingerprints via `ring::digest`.
//!
//! A fingerprint is the uppercase hex SHA-1 of a certificate's *signature*
//! bytes, not of its full DER encoding. Two certificates carrying the same
//! signature are therefore the same certificate as far as trust policy is
//! concerned; every other field is ignored for identity.

use ring::digest::{digest, SHA1_FOR_LEGACY_USE_ONLY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TrustError};

/// Length of a hex-encoded SHA-1 digest.
pub const FINGERPRINT_HEX_LEN: usize = 40;

/// Identity key for a certificate. Always stored in uppercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the given signature bytes.
    #[must_use]
    pub fn of_signature(signature: &[u8]) -> Self {
        let digest = digest(&SHA1_FOR_LEGACY_USE_ONLY, signature);
        Self(hex::encode_upper(digest.as_ref()))
    }

    /// Parse a hex fingerprint in any case.
    pub fn parse(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != FINGERPRINT_HEX_LEN {
            return Err(TrustError::decode(format!(
                "fingerprint {trimmed:?} is {} characters, expected {FINGERPRINT_HEX_LEN}",
                trimmed.len()
            )));
        }
        hex::decode(trimmed)
            .map_err(|e| TrustError::decode(format!("fingerprint {trimmed:?}: {e}")))?;
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Case-insensitive comparison against a raw hex string.
    #[must_use]
    pub fn matches_str(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }

    /// Uppercase hex form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = TrustError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.0
    }
}
