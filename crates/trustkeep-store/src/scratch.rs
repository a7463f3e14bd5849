//! Scoped temporary files for export/import round trips, and
//! all-or-nothing file replacement.

use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use trustkeep_core::{Result, TrustError};

/// A temp file path that is deleted when dropped, on every exit path.
/// Deletion failures are logged rather than discarded.
#[derive(Debug)]
pub struct ScratchFile {
    path: Option<TempPath>,
}

impl ScratchFile {
    pub fn new(prefix: &str, suffix: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()
            .map_err(|e| TrustError::io(std::env::temp_dir(), e))?;
        Ok(Self {
            path: Some(file.into_temp_path()),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Keep the file on disk and hand back its path.
    pub fn keep(mut self) -> Result<PathBuf> {
        let Some(path) = self.path.take() else {
            return Err(TrustError::Validation("scratch file already released".into()));
        };
        path.keep().map_err(|e| {
            let shown = e.path.to_path_buf();
            TrustError::io(shown, e.error)
        })
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.to_path_buf();
            if let Err(e) = path.close() {
                warn!(path = %shown.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

/// Copy `source` to `dest` so that `dest` is either untouched or complete.
///
/// The data is staged in a temp file beside the real target and renamed over
/// it. A symlinked `dest` is resolved first so the link itself survives, and
/// an existing target keeps its permissions.
pub async fn copy_atomically(source: &Path, dest: &Path) -> Result<()> {
    let target = match tokio::fs::canonicalize(dest).await {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => dest.to_path_buf(),
        Err(e) => return Err(TrustError::io(dest, e)),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let staged = NamedTempFile::new_in(&dir).map_err(|e| TrustError::io(&dir, e))?;
    tokio::fs::copy(source, staged.path())
        .await
        .map_err(|e| TrustError::io(source, e))?;

    if let Ok(meta) = tokio::fs::metadata(&target).await {
        tokio::fs::set_permissions(staged.path(), meta.permissions())
            .await
            .map_err(|e| TrustError::io(staged.path(), e))?;
    }
    staged
        .as_file()
        .sync_all()
        .map_err(|e| TrustError::io(staged.path(), e))?;

    staged
        .persist(&target)
        .map_err(|e| TrustError::io(&target, e.error))?;
    debug!(source = %source.display(), target = %target.display(), "replaced file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_file() {
        let scratch = ScratchFile::new("trustkeep-test", ".xml").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".xml"));

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_persists_file() {
        let scratch = ScratchFile::new("trustkeep-test", ".pem").unwrap();
        let kept = scratch.keep().unwrap();
        assert!(kept.exists());
        std::fs::remove_file(kept).unwrap();
    }

    #[test]
    fn test_drop_tolerates_file_already_gone() {
        let scratch = ScratchFile::new("trustkeep-test", "").unwrap();
        std::fs::remove_file(scratch.path()).unwrap();
        drop(scratch);
    }

    #[tokio::test]
    async fn test_copy_atomically_creates_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.pem");
        let dest = tmp.path().join("dest.pem");
        std::fs::write(&source, b"new contents").unwrap();

        copy_atomically(&source, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new contents");

        std::fs::write(&source, b"newer").unwrap();
        copy_atomically(&source, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"newer");
        // Only source and dest remain; no staged leftovers.
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_failed_copy_leaves_target_and_directory_untouched() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("dest.pem");
        std::fs::write(&dest, b"original").unwrap();

        // A directory cannot be copied from.
        let err = copy_atomically(tmp.path(), &dest).await.unwrap_err();
        assert!(matches!(err, TrustError::Io { .. }));
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_read_error_midway_keeps_target() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("dest.pem");
        std::fs::write(&dest, b"original").unwrap();

        // Opens as a regular file, then fails with EIO on the first read.
        assert!(copy_atomically(Path::new("/proc/self/mem"), &dest).await.is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"original");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_copy_through_symlink_keeps_link_and_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("tls-ca-bundle.pem");
        let link = tmp.path().join("ca-bundle.crt");
        let source = tmp.path().join("snapshot.pem");
        std::fs::write(&real, b"old").unwrap();
        std::fs::set_permissions(&real, std::fs::Permissions::from_mode(0o644)).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        std::fs::write(&source, b"restored").unwrap();
        std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o600)).unwrap();

        copy_atomically(&source, &link).await.unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&real).unwrap(), b"restored");
        let mode = std::fs::metadata(&real).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }
}
