//! Typed tree for the trust-settings property list.
//!
//! ```text
//! TrustPolicyDocument           <dict> root
//!   trust_version               <key>trustVersion</key><integer>
//!   trust_list: TrustList       <key>trustList</key><dict>
//!     keys                      <key>FINGERPRINT</key> per entry
//!     columns: EntryColumns     every per-entry <dict>, flattened
//!       dates                   <date> per entry
//!       data                    <data> issuerName (2i), serialNumber (2i+1)
//!       results                 kSecTrustSettingsResult, if any
//! ```
//!
//! The columns are positional: entry `i` owns `keys[i]`, `dates[i]`,
//! `data[2i]`, `data[2i + 1]` and `results[i]`.

use trustkeep_core::{Result, TrustError};

pub const TRUST_LIST_KEY: &str = "trustList";
pub const TRUST_VERSION_KEY: &str = "trustVersion";
pub const ISSUER_NAME_KEY: &str = "issuerName";
pub const MOD_DATE_KEY: &str = "modDate";
pub const SERIAL_NUMBER_KEY: &str = "serialNumber";
pub const TRUST_SETTINGS_KEY: &str = "trustSettings";
pub const TRUST_RESULT_KEY: &str = "kSecTrustSettingsResult";

/// Current trust-settings format version.
pub const TRUST_VERSION: i64 = 1;

/// Fixed UTC pattern used for `<date>` elements.
pub const MOD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Root of a trust-settings export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPolicyDocument {
    pub trust_list: TrustList,
    pub trust_version: Option<i64>,
}

/// The `trustList` dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustList {
    /// Uppercase hex fingerprints, one per entry
    pub keys: Vec<String>,
    pub columns: EntryColumns,
}

/// Values from every per-entry dictionary, flattened in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryColumns {
    /// `modDate` values
    pub dates: Vec<String>,
    /// Base64 `issuerName` and `serialNumber`, interleaved
    pub data: Vec<String>,
    /// `kSecTrustSettingsResult` per entry; empty when never recorded
    pub results: Vec<Option<i64>>,
}

impl TrustPolicyDocument {
    /// Number of entries, as counted by keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trust_list.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trust_list.keys.is_empty()
    }

    /// Check the positional invariants between the three columns.
    pub fn validate(&self) -> Result<()> {
        let n = self.len();
        let columns = &self.trust_list.columns;

        if columns.dates.len() != n {
            return Err(TrustError::decode(format!(
                "trust list has {n} keys but {} dates",
                columns.dates.len()
            )));
        }
        if columns.data.len() != n * 2 {
            return Err(TrustError::decode(format!(
                "trust list has {n} keys but {} data elements, expected {}",
                columns.data.len(),
                n * 2
            )));
        }
        if !columns.results.is_empty() && columns.results.len() != n {
            return Err(TrustError::decode(format!(
                "trust list has {n} keys but {} result slots",
                columns.results.len()
            )));
        }
        Ok(())
    }

    /// The `(issuerName, serialNumber)` data pair for entry `i`.
    #[must_use]
    pub fn data_pair(&self, i: usize) -> Option<(&str, &str)> {
        let data = &self.trust_list.columns.data;
        Some((data.get(2 * i)?.as_str(), data.get(2 * i + 1)?.as_str()))
    }

    #[must_use]
    pub fn result(&self, i: usize) -> Option<i64> {
        self.trust_list.columns.results.get(i).copied().flatten()
    }
}
