//! Platform trust store backends.

pub mod darwin;
pub mod linux;
pub mod nss;

use std::path::{Path, PathBuf};
use tracing::debug;

use trustkeep_core::{Certificate, Result, Whitelist};

use crate::backups::BackupDirectory;
use crate::config::{App, Platform, StoreConfig};
use crate::utility::{Certutil, SecurityCli};

pub use darwin::DarwinStore;
pub use linux::LinuxStore;
pub use nss::NssStore;

/// A policy file produced by `remove`, waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPolicy {
    pub path: PathBuf,
    /// Certificates the policy keeps
    pub kept: usize,
    /// Certificates left out of it
    pub dropped: usize,
}

/// The trust store of the running system, or of one application on it.
#[derive(Debug)]
pub enum TrustStore {
    Darwin(DarwinStore),
    Linux(LinuxStore),
    Nss(NssStore),
}

impl TrustStore {
    /// Build the backend for the configured (or detected) platform.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::for_platform(config.platform()?, config)
    }

    pub fn for_platform(platform: Platform, config: &StoreConfig) -> Result<Self> {
        let backups = BackupDirectory::resolve(platform, config.backup_dir.as_deref())?;
        debug!(%platform, backups = %backups.path().display(), "opening trust store");

        Ok(match platform {
            Platform::Darwin => Self::Darwin(DarwinStore::new(
                SecurityCli::from_config(config),
                config.keychains.clone(),
                backups,
                config.verbose_counts,
            )),
            Platform::Linux => Self::Linux(LinuxStore::new(
                LinuxStore::locate(config.ca_bundle.as_deref())?,
                backups,
                config.verbose_counts,
            )),
        })
    }

    /// Build the store an application keeps for itself.
    ///
    /// Chrome on darwin trusts the system keychain, so it gets the darwin
    /// backend. Unknown application names are a config error.
    pub fn for_app(app: &str, config: &StoreConfig) -> Result<Self> {
        let app: App = app.parse()?;
        let platform = config.platform()?;
        if app == App::Chrome && platform == Platform::Darwin {
            return Self::for_platform(platform, config);
        }

        let db_dir = match &config.nss_db {
            Some(dir) => dir.clone(),
            None => nss::locate_db(app, platform)?,
        };
        let backups = BackupDirectory::resolve_for_app(app, platform, config.backup_dir.as_deref())?;
        debug!(%app, db = %db_dir.display(), backups = %backups.path().display(), "opening application trust store");

        Ok(Self::Nss(NssStore::new(
            Certutil::from_config(config),
            app,
            db_dir,
            backups,
            config.verbose_counts,
        )))
    }

    /// Short backend name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Darwin(_) => "darwin",
            Self::Linux(_) => "linux",
            Self::Nss(store) => store.app().name(),
        }
    }

    pub const fn backups(&self) -> &BackupDirectory {
        match self {
            Self::Darwin(store) => store.backups(),
            Self::Linux(store) => store.backups(),
            Self::Nss(store) => store.backups(),
        }
    }

    pub async fn list(&self) -> Result<Vec<Certificate>> {
        match self {
            Self::Darwin(store) => store.list().await,
            Self::Linux(store) => store.list().await,
            Self::Nss(store) => store.list().await,
        }
    }

    /// Snapshot the current configuration; returns the snapshot path.
    pub async fn backup(&self) -> Result<PathBuf> {
        match self {
            Self::Darwin(store) => store.backup().await,
            Self::Linux(store) => store.backup().await,
            Self::Nss(store) => store.backup().await,
        }
    }

    pub async fn restore(&self, target: Option<&Path>) -> Result<PathBuf> {
        match self {
            Self::Darwin(store) => store.restore(target).await,
            Self::Linux(store) => store.restore(target).await,
            Self::Nss(store) => store.restore(target).await,
        }
    }

    pub async fn remove(&self, whitelist: &dyn Whitelist) -> Result<GeneratedPolicy> {
        match self {
            Self::Darwin(store) => store.remove(whitelist).await,
            Self::Linux(store) => store.remove(whitelist).await,
            Self::Nss(store) => store.remove(whitelist).await,
        }
    }

    pub async fn apply(&self, policy: &Path) -> Result<()> {
        match self {
            Self::Darwin(store) => store.apply(policy).await,
            Self::Linux(store) => store.apply(policy).await,
            Self::Nss(store) => store.apply(policy).await,
        }
    }
}
