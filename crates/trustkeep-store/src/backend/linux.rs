//! Linux backend: a single distribution CA bundle file.
//!
//! The bundle is the whole trust configuration here, so a snapshot is a
//! straight copy of it and restoring copies a snapshot back over it. The
//! live bundle is only ever replaced by rename, never rewritten in place.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use trustkeep_core::{dedup, parse_pem_stream, Certificate, Result, TrustError, Whitelist};

use super::GeneratedPolicy;
use crate::backups::BackupDirectory;
use crate::scratch::{copy_atomically, ScratchFile};

/// Well-known bundle locations, checked in order.
pub const CA_BUNDLE_PATHS: &[&str] = &[
    // Debian / Ubuntu / Arch
    "/etc/ssl/certs/ca-certificates.crt",
    // Fedora / RHEL
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/certs/ca-bundle.crt",
    // p11-kit trust anchors
    "/etc/ca-certificates/extracted/tls-ca-bundle.pem",
    // SUSE
    "/etc/ssl/ca-bundle.pem",
    // Alpine
    "/etc/ssl/cert.pem",
];

/// Trust store backed by a PEM bundle.
#[derive(Debug, Clone)]
pub struct LinuxStore {
    bundle: PathBuf,
    backups: BackupDirectory,
    verbose_counts: bool,
}

impl LinuxStore {
    pub fn new(bundle: impl Into<PathBuf>, backups: BackupDirectory, verbose_counts: bool) -> Self {
        Self {
            bundle: bundle.into(),
            backups,
            verbose_counts,
        }
    }

    /// The configured bundle, or the first well-known one present.
    pub fn locate(configured: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = configured {
            return Ok(path.to_path_buf());
        }
        CA_BUNDLE_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .map(Path::to_path_buf)
            .ok_or_else(|| TrustError::NotFound("no CA bundle found in the usual locations".into()))
    }

    pub fn bundle(&self) -> &Path {
        &self.bundle
    }

    pub const fn backups(&self) -> &BackupDirectory {
        &self.backups
    }

    /// Every distinct certificate in the bundle.
    pub async fn list(&self) -> Result<Vec<Certificate>> {
        let raw = tokio::fs::read(&self.bundle)
            .await
            .map_err(|e| TrustError::io(&self.bundle, e))?;
        let blocks = parse_pem_stream(&raw)?;
        let total = blocks.len();
        let certs = dedup(blocks);

        if self.verbose_counts {
            info!(
                blocks = total,
                distinct = certs.len(),
                "{} PEM blocks, {} distinct certificates",
                total,
                certs.len()
            );
        }
        debug!(bundle = %self.bundle.display(), count = certs.len(), "read CA bundle");
        Ok(certs)
    }

    /// Copy the bundle into the backup directory.
    pub async fn backup(&self) -> Result<PathBuf> {
        if !self.bundle.is_file() {
            return Err(TrustError::NotFound(format!(
                "CA bundle {} does not exist",
                self.bundle.display()
            )));
        }
        let snapshot = self
            .backups
            .store(&self.bundle, Utc::now().timestamp())
            .await?;
        Ok(snapshot.path)
    }

    /// Copy a snapshot (latest when `target` is `None`) over the bundle.
    pub async fn restore(&self, target: Option<&Path>) -> Result<PathBuf> {
        let path = self.backups.restore_target(target).await?;
        self.install(&path).await?;
        info!(snapshot = %path.display(), bundle = %self.bundle.display(), "restored CA bundle");
        Ok(path)
    }

    /// Write a trimmed bundle holding only whitelisted certificates.
    pub async fn remove(&self, whitelist: &dyn Whitelist) -> Result<GeneratedPolicy> {
        let certs = self.list().await?;
        let kept: Vec<pem::Pem> = certs
            .iter()
            .filter(|cert| whitelist.matches(cert))
            .map(Certificate::to_pem)
            .collect();
        let dropped = certs.len() - kept.len();

        let scratch = ScratchFile::new("trustkeep-bundle-", ".pem")?;
        tokio::fs::write(scratch.path(), pem::encode_many(&kept))
            .await
            .map_err(|e| TrustError::io(scratch.path(), e))?;
        let path = scratch.keep()?;

        info!(bundle = %path.display(), kept = kept.len(), dropped, "generated trimmed CA bundle");
        Ok(GeneratedPolicy {
            path,
            kept: kept.len(),
            dropped,
        })
    }

    /// Install a generated bundle after checking it parses.
    pub async fn apply(&self, bundle: &Path) -> Result<()> {
        if !bundle.is_file() {
            return Err(TrustError::Validation(format!(
                "bundle file {} does not exist",
                bundle.display()
            )));
        }
        let raw = tokio::fs::read(bundle)
            .await
            .map_err(|e| TrustError::io(bundle, e))?;
        let count = dedup(parse_pem_stream(&raw)?).len();
        self.install(bundle).await?;
        info!(bundle = %self.bundle.display(), certificates = count, "applied CA bundle");
        Ok(())
    }

    async fn install(&self, source: &Path) -> Result<()> {
        copy_atomically(source, &self.bundle).await
    }
}
