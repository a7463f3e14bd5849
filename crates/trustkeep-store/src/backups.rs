//! Snapshot history on disk.
//!
//! Snapshots are plain files named `trust-backup-<unix-seconds>.<ext>`.
//! "Latest" is decided by the timestamp in the name, never by mtime, so
//! copying a backup directory around keeps the ordering intact. Only files
//! with the directory's own extension count, so darwin and linux snapshots
//! sharing one directory never mix. Two snapshots taken within the same
//! second share a name; the later one overwrites the earlier.
//!
//! A snapshot is staged under a temp name and renamed into place, so a
//! failed copy never leaves a `trust-backup-*` file behind.

use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use trustkeep_core::{Result, TrustError};

use crate::config::{App, Platform};
use crate::scratch::copy_atomically;

const SNAPSHOT_PREFIX: &str = "trust-backup-";

#[cfg(unix)]
const BACKUP_DIR_MODE: u32 = 0o744;

/// One saved copy of the trust configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub path: PathBuf,
    /// Unix seconds embedded in the file name
    pub created: i64,
}

impl Snapshot {
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.created, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// The per-user directory holding snapshots.
#[derive(Debug, Clone)]
pub struct BackupDirectory {
    root: PathBuf,
    extension: String,
}

impl BackupDirectory {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    /// The configured directory, or the platform default under `$HOME`.
    pub fn resolve(platform: Platform, configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(
            Self::base(platform, configured)?,
            platform.backup_extension(),
        ))
    }

    /// A per-application subdirectory of the platform backup directory.
    pub fn resolve_for_app(app: App, platform: Platform, configured: Option<&Path>) -> Result<Self> {
        Ok(Self::new(
            Self::base(platform, configured)?.join(app.name()),
            app.backup_extension(),
        ))
    }

    fn base(platform: Platform, configured: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = configured {
            return Ok(dir.to_path_buf());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| TrustError::Config("could not determine home directory".into()))?;
        Ok(match platform {
            Platform::Darwin => home.join("Library").join("trustkeep"),
            Platform::Linux => home.join(".trustkeep"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Where a snapshot taken at `created` would be written.
    #[must_use]
    pub fn snapshot_path(&self, created: i64) -> PathBuf {
        self.root
            .join(format!("{SNAPSHOT_PREFIX}{created}.{}", self.extension))
    }

    /// Create the directory if needed.
    pub async fn ensure(&self) -> Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(BACKUP_DIR_MODE);
        builder
            .create(&self.root)
            .await
            .map_err(|e| TrustError::io(&self.root, e))
    }

    /// All snapshots, oldest first. A missing directory has none.
    pub async fn snapshots(&self) -> Result<Vec<Snapshot>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %self.root.display(), "backup directory does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(TrustError::io(&self.root, e)),
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| TrustError::io(&self.root, e))?
        {
            let name = entry.file_name();
            let Some(created) = name
                .to_str()
                .and_then(|n| parse_snapshot_name(n, &self.extension))
            else {
                debug!(file = ?name, "ignoring non-snapshot file");
                continue;
            };
            snapshots.push(Snapshot {
                path: entry.path(),
                created,
            });
        }

        snapshots.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
        Ok(snapshots)
    }

    /// The most recent snapshot, if any.
    pub async fn latest(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshots().await?.pop())
    }

    /// Copy `source` into the directory as a new snapshot.
    pub async fn store(&self, source: &Path, created: i64) -> Result<Snapshot> {
        self.ensure().await?;
        let dest = self.snapshot_path(created);
        copy_atomically(source, &dest).await?;
        info!(snapshot = %dest.display(), "stored trust snapshot");
        Ok(Snapshot {
            path: dest,
            created,
        })
    }

    /// Pick the file a restore should use.
    ///
    /// An explicit (non-empty) path wins; otherwise the latest snapshot.
    /// Fails with `NotFound` when neither exists and `Validation` when the
    /// chosen path is not a file.
    pub async fn restore_target(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        let path = match explicit.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => path.to_path_buf(),
            None => {
                self.latest()
                    .await?
                    .ok_or_else(|| {
                        TrustError::NotFound(format!(
                            "no backup in {} and no restore file given",
                            self.root.display()
                        ))
                    })?
                    .path
            }
        };

        if !path.is_file() {
            return Err(TrustError::Validation(format!(
                "restore file {} does not exist",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Extract the timestamp from `trust-backup-<digits>.<ext>`.
fn parse_snapshot_name(name: &str, ext: &str) -> Option<i64> {
    let stamp = name
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(ext)?
        .strip_suffix('.')?;
    if stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stamp.parse().ok()
}
