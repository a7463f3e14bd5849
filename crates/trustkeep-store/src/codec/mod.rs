//! Trust policy codec.
//!
//! [`encode`] and [`decode`] map between trust entries and the typed
//! [`TrustPolicyDocument`]; the [`xml`] module moves that document to and
//! from the property-list markup the native tool reads and writes.

pub mod document;
pub mod xml;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::NaiveDateTime;

use trustkeep_core::{
    DistinguishedName, Fingerprint, Result, TrustEntry, TrustError, TrustResult,
};

pub use document::{EntryColumns, TrustList, TrustPolicyDocument, MOD_DATE_FORMAT, TRUST_VERSION};
pub use xml::{from_xml, read_policy_file, to_xml, write_policy_file};

/// Build a policy document from trust entries.
#[must_use]
pub fn encode(entries: &[TrustEntry]) -> TrustPolicyDocument {
    let mut keys = Vec::with_capacity(entries.len());
    let mut dates = Vec::with_capacity(entries.len());
    let mut data = Vec::with_capacity(entries.len() * 2);
    let mut results = Vec::with_capacity(entries.len());

    for entry in entries {
        keys.push(entry.fingerprint.as_str().to_ascii_uppercase());
        dates.push(entry.modified.format(MOD_DATE_FORMAT).to_string());
        data.push(STANDARD.encode(entry.issuer.as_der()));
        data.push(STANDARD.encode(&entry.serial));
        results.push(entry.trust_result.map(TrustResult::code));
    }

    // An all-absent column is dropped so the markup stays minimal.
    if results.iter().all(Option::is_none) {
        results.clear();
    }

    TrustPolicyDocument {
        trust_list: TrustList {
            keys,
            columns: EntryColumns {
                dates,
                data,
                results,
            },
        },
        trust_version: Some(TRUST_VERSION),
    }
}

/// Rebuild trust entries from a policy document.
pub fn decode(doc: &TrustPolicyDocument) -> Result<Vec<TrustEntry>> {
    doc.validate()?;

    let list = &doc.trust_list;
    let mut entries = Vec::with_capacity(doc.len());

    for (i, key) in list.keys.iter().enumerate() {
        let fingerprint = Fingerprint::parse(key)?;

        let (issuer_b64, serial_b64) = doc
            .data_pair(i)
            .ok_or_else(|| TrustError::decode(format!("entry {i} has no data pair")))?;
        let issuer = DistinguishedName::from_der(&decode_base64(issuer_b64, i, "issuerName")?)?;
        let serial = decode_base64(serial_b64, i, "serialNumber")?;

        let date = &list.columns.dates[i];
        let modified = NaiveDateTime::parse_from_str(date.trim(), MOD_DATE_FORMAT)
            .map_err(|e| TrustError::decode(format!("entry {i} modDate {date:?}: {e}")))?
            .and_utc();

        entries.push(TrustEntry {
            fingerprint,
            issuer,
            modified,
            serial,
            trust_result: doc.result(i).map(TrustResult::from),
        });
    }

    Ok(entries)
}

/// Property lists wrap `<data>` across lines; whitespace is not significant.
fn decode_base64(text: &str, index: usize, field: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| TrustError::decode(format!("entry {index} {field}: {e}")))
}
