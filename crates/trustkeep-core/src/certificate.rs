//! Parsed certificates, PEM stream decoding and fingerprint dedup.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, warn};
use x509_parser::prelude::{FromDer, X509Certificate, X509Name};

use crate::error::{Result, TrustError};
use crate::fingerprint::Fingerprint;

/// An issuer (or subject) name kept in its canonical DER encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DistinguishedName {
    der: Vec<u8>,
    display: String,
}

impl DistinguishedName {
    /// Parse a DER-encoded X.501 `Name`. Trailing bytes are rejected.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (rest, name) = X509Name::from_der(der)
            .map_err(|e| TrustError::decode(format!("distinguished name: {e}")))?;
        if !rest.is_empty() {
            return Err(TrustError::decode(format!(
                "distinguished name has {} trailing bytes",
                rest.len()
            )));
        }
        Ok(Self::from_name(&name))
    }

    fn from_name(name: &X509Name<'_>) -> Self {
        Self {
            der: name.as_raw().to_vec(),
            display: name.to_string(),
        }
    }

    /// Canonical DER bytes.
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// An installed certificate. Immutable once parsed.
///
/// Equality and hashing go through [`Fingerprint`] only.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    fingerprint: Fingerprint,
    issuer: DistinguishedName,
    subject: String,
    serial: Vec<u8>,
    signature: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl Certificate {
    /// Parse a single DER-encoded X.509 certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| TrustError::decode(format!("certificate: {e}")))?;

        let signature = cert.signature_value.data.to_vec();

        Ok(Self {
            der: der.to_vec(),
            fingerprint: Fingerprint::of_signature(&signature),
            issuer: DistinguishedName::from_name(cert.issuer()),
            subject: cert.subject().to_string(),
            serial: minimal_serial(cert.raw_serial()),
            signature,
            not_before: asn1_to_utc(cert.validity().not_before),
            not_after: asn1_to_utc(cert.validity().not_after),
        })
    }

    /// Identity key.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    #[must_use]
    pub const fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Serial number as minimal big-endian bytes.
    #[must_use]
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub const fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    #[must_use]
    pub const fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `other` is the same certificate by fingerprint.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }

    /// Re-encode as a PEM `CERTIFICATE` block.
    #[must_use]
    pub fn to_pem(&self) -> pem::Pem {
        pem::Pem::new("CERTIFICATE", self.der.clone())
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fingerprint.hash(state);
    }
}

/// Parse a concatenated stream of PEM blocks, as dumped by a trust utility.
///
/// Blocks that are not certificates, or that fail to parse, come back as
/// `None` so callers can skip them. A stream that is not PEM at all is a
/// decode error.
pub fn parse_pem_stream(bytes: &[u8]) -> Result<Vec<Option<Certificate>>> {
    let blocks =
        pem::parse_many(bytes).map_err(|e| TrustError::decode(format!("pem stream: {e}")))?;

    let certs = blocks
        .iter()
        .map(|block| {
            if block.tag() != "CERTIFICATE" {
                debug!(tag = block.tag(), "skipping non-certificate pem block");
                return None;
            }
            match Certificate::from_der(block.contents()) {
                Ok(cert) => Some(cert),
                Err(e) => {
                    warn!(error = %e, "skipping unparseable certificate");
                    None
                }
            }
        })
        .collect();

    Ok(certs)
}

/// Drop later duplicates by fingerprint, keeping first-seen order.
/// Absent certificates are skipped.
pub fn dedup<I>(certs: I) -> Vec<Certificate>
where
    I: IntoIterator<Item = Option<Certificate>>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for cert in certs.into_iter().flatten() {
        if seen.insert(cert.fingerprint().clone()) {
            out.push(cert);
        }
    }
    out
}

/// Strip the DER sign-padding so serials compare as unsigned magnitudes.
fn minimal_serial(raw: &[u8]) -> Vec<u8> {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    raw[start..].to_vec()
}

fn asn1_to_utc(t: x509_parser::time::ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
