//! macOS backend: system keychains plus `security` trust settings.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use trustkeep_core::{
    dedup, parse_pem_stream, Certificate, Result, TrustEntries, TrustEntry, TrustError, Whitelist,
};

use super::GeneratedPolicy;
use crate::backups::BackupDirectory;
use crate::codec::{decode, encode, read_policy_file, write_policy_file};
use crate::scratch::ScratchFile;
use crate::utility::{SecurityCli, TrustUtility};

/// Trust store backed by the keychain and its trust-settings policy.
#[derive(Debug)]
pub struct DarwinStore<U = SecurityCli> {
    utility: U,
    keychains: Vec<PathBuf>,
    backups: BackupDirectory,
    verbose_counts: bool,
}

impl<U: TrustUtility> DarwinStore<U> {
    pub const fn new(
        utility: U,
        keychains: Vec<PathBuf>,
        backups: BackupDirectory,
        verbose_counts: bool,
    ) -> Self {
        Self {
            utility,
            keychains,
            backups,
            verbose_counts,
        }
    }

    pub const fn utility(&self) -> &U {
        &self.utility
    }

    pub const fn backups(&self) -> &BackupDirectory {
        &self.backups
    }

    /// Installed certificates that also carry trust policy.
    pub async fn list(&self) -> Result<Vec<Certificate>> {
        let installed = self.installed().await?;
        let policy = self.policy_entries().await?;

        if self.verbose_counts {
            info!(
                installed = installed.len(),
                with_policy = policy.len(),
                "{} installed, {} with policy",
                installed.len(),
                policy.len()
            );
        }

        let kept: Vec<Certificate> = installed
            .into_iter()
            .filter(|cert| policy.contains(Some(cert)))
            .collect();
        debug!(kept = kept.len(), "cross-referenced installed certificates");
        Ok(kept)
    }

    /// Save the current trust policy into the backup directory.
    pub async fn backup(&self) -> Result<PathBuf> {
        let export = self.export_to_scratch().await?;
        let stored = self
            .backups
            .store(export.path(), Utc::now().timestamp())
            .await;
        drop(export);
        Ok(stored?.path)
    }

    /// Import a snapshot, the latest one when `target` is `None`.
    pub async fn restore(&self, target: Option<&Path>) -> Result<PathBuf> {
        let path = self.backups.restore_target(target).await?;
        self.utility.import_policy(&path).await?;
        info!(snapshot = %path.display(), "restored trust policy");
        Ok(path)
    }

    /// Generate (but do not apply) a policy keeping only whitelisted certificates.
    pub async fn remove(&self, whitelist: &dyn Whitelist) -> Result<GeneratedPolicy> {
        let certs = self.list().await?;
        let now = Utc::now();

        let entries: Vec<TrustEntry> = certs
            .iter()
            .filter(|cert| whitelist.matches(cert))
            .map(|cert| TrustEntry::from_certificate(cert, now))
            .collect();

        let scratch = ScratchFile::new("trustkeep-policy-", ".xml")?;
        write_policy_file(scratch.path(), &encode(&entries)).await?;
        let path = scratch.keep()?;

        info!(
            policy = %path.display(),
            kept = entries.len(),
            dropped = certs.len() - entries.len(),
            "generated trimmed trust policy"
        );
        Ok(GeneratedPolicy {
            path,
            kept: entries.len(),
            dropped: certs.len() - entries.len(),
        })
    }

    /// Import a previously generated policy file.
    ///
    /// The file must decode cleanly; a broken document never reaches the tool.
    pub async fn apply(&self, policy: &Path) -> Result<()> {
        if !policy.is_file() {
            return Err(TrustError::Validation(format!(
                "policy file {} does not exist",
                policy.display()
            )));
        }
        let entries = decode(&read_policy_file(policy).await?)?;
        self.utility.import_policy(policy).await?;
        info!(policy = %policy.display(), entries = entries.len(), "applied trust policy");
        Ok(())
    }

    async fn installed(&self) -> Result<Vec<Certificate>> {
        let raw = self.utility.find_certificates(&self.keychains).await?;
        Ok(dedup(parse_pem_stream(&raw)?))
    }

    async fn policy_entries(&self) -> Result<TrustEntries> {
        let export = self.export_to_scratch().await?;
        let doc = read_policy_file(export.path()).await?;
        Ok(decode(&doc)?.into())
    }

    async fn export_to_scratch(&self) -> Result<ScratchFile> {
        let scratch = ScratchFile::new("trust-settings-", ".xml")?;
        self.utility.export_policy(scratch.path()).await?;
        Ok(scratch)
    }
}
