//! Shared fixtures for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rcgen::{CertificateParams, DnType, KeyPair, SerialNumber};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use trustkeep_core::{Certificate, Result, TrustEntry, TrustError};

use crate::codec::{encode, to_xml};
use crate::utility::{NssUtility, TrustUtility};

/// Mint a throwaway self-signed certificate, returned as PEM plus its parse.
pub fn generated_pem(cn: &str, serial: &[u8]) -> (String, Certificate) {
    let key_pair = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    params.distinguished_name.push(DnType::CountryName, "US");
    params.serial_number = Some(SerialNumber::from_slice(serial));
    let cert = params.self_signed(&key_pair).unwrap();
    let parsed = Certificate::from_der(cert.der()).unwrap();
    (cert.pem(), parsed)
}

pub fn generated_cert(cn: &str, serial: &[u8]) -> Certificate {
    generated_pem(cn, serial).1
}

pub fn entry_for(cert: &Certificate, when: DateTime<Utc>) -> TrustEntry {
    TrustEntry::from_certificate(cert, when)
}

/// Policy XML listing exactly the given certificates.
pub fn policy_xml(certs: &[&Certificate]) -> Vec<u8> {
    let entries: Vec<_> = certs.iter().map(|c| entry_for(c, Utc::now())).collect();
    to_xml(&encode(&entries)).unwrap()
}

/// In-memory stand-in for `security(1)`.
///
/// Export writes the current policy bytes; import records the call and makes
/// the imported file the current policy.
#[derive(Debug, Default)]
pub struct FakeUtility {
    pub installed: Vec<u8>,
    pub policy: Mutex<Vec<u8>>,
    pub fail_export: bool,
    pub exported_to: Mutex<Vec<PathBuf>>,
    pub imported: Mutex<Vec<PathBuf>>,
}

impl FakeUtility {
    pub fn new(installed: impl Into<Vec<u8>>, policy: Vec<u8>) -> Self {
        Self {
            installed: installed.into(),
            policy: Mutex::new(policy),
            ..Self::default()
        }
    }

    pub fn imports(&self) -> Vec<PathBuf> {
        self.imported.lock().unwrap().clone()
    }

    pub fn exports(&self) -> Vec<PathBuf> {
        self.exported_to.lock().unwrap().clone()
    }

    pub fn current_policy(&self) -> Vec<u8> {
        self.policy.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustUtility for FakeUtility {
    async fn find_certificates(&self, _keychains: &[PathBuf]) -> Result<Vec<u8>> {
        Ok(self.installed.clone())
    }

    async fn export_policy(&self, dest: &Path) -> Result<()> {
        self.exported_to.lock().unwrap().push(dest.to_path_buf());
        if self.fail_export {
            return Err(TrustError::exit("security", Some(1), b"export refused"));
        }
        let policy = self.current_policy();
        std::fs::write(dest, policy).map_err(|e| TrustError::io(dest, e))
    }

    async fn import_policy(&self, src: &Path) -> Result<()> {
        self.imported.lock().unwrap().push(src.to_path_buf());
        let bytes = std::fs::read(src).map_err(|e| TrustError::io(src, e))?;
        *self.policy.lock().unwrap() = bytes;
        Ok(())
    }
}

/// In-memory stand-in for NSS `certutil(1)`.
#[derive(Debug, Default)]
pub struct FakeCertutil {
    pub listing: Vec<u8>,
    pub certs: HashMap<String, String>,
    pub fail_listing: bool,
    pub exported: Mutex<Vec<String>>,
}

impl FakeCertutil {
    pub fn new(listing: impl Into<Vec<u8>>) -> Self {
        Self {
            listing: listing.into(),
            ..Self::default()
        }
    }

    pub fn with_cert(mut self, nickname: &str, pem: String) -> Self {
        self.certs.insert(nickname.to_string(), pem);
        self
    }

    pub fn exported(&self) -> Vec<String> {
        self.exported.lock().unwrap().clone()
    }
}

#[async_trait]
impl NssUtility for FakeCertutil {
    async fn list_nicknames(&self, _db: &Path) -> Result<Vec<u8>> {
        if self.fail_listing {
            return Err(TrustError::exit("certutil", Some(255), b"SEC_ERROR_BAD_DATABASE"));
        }
        Ok(self.listing.clone())
    }

    async fn export_certificate(&self, _db: &Path, nickname: &str) -> Result<Vec<u8>> {
        self.exported.lock().unwrap().push(nickname.to_string());
        self.certs
            .get(nickname)
            .map(|pem| pem.clone().into_bytes())
            .ok_or_else(|| TrustError::exit("certutil", Some(255), b"could not find certificate"))
    }
}
