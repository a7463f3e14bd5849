//! Application trust stores kept in an NSS database.
//!
//! Firefox keeps one per profile and Chrome on Linux shares `~/.pki/nssdb`.
//! The certificate table lives in `cert9.db`, so a snapshot is a copy of
//! that file. Trimming is not offered here: NSS trust edits go through
//! `certutil -M` per nickname, which has no policy-file equivalent.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use trustkeep_core::{dedup, parse_pem_stream, Certificate, Result, TrustError, Whitelist};

use super::GeneratedPolicy;
use crate::backups::BackupDirectory;
use crate::config::{App, Platform};
use crate::scratch::copy_atomically;
use crate::utility::{Certutil, NssUtility};

/// The SQLite certificate database inside an NSS directory.
pub const CERT_DB: &str = "cert9.db";

/// One row of `certutil -L`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NssEntry {
    pub nickname: String,
    /// `SSL,S/MIME,JAR/XPI` trust flags, e.g. `CT,C,C`
    pub trust: String,
}

impl NssEntry {
    /// Whether the entry is a trusted CA for TLS servers.
    pub fn trusted_for_ssl(&self) -> bool {
        self.trust
            .split(',')
            .next()
            .is_some_and(|ssl| ssl.contains('C'))
    }
}

/// Parse the nickname table printed by `certutil -L`.
///
/// Header lines have no trust column and are skipped. Nicknames may contain
/// spaces, so the trust flags are taken from the last field.
pub fn parse_nss_listing(raw: &[u8]) -> Vec<NssEntry> {
    String::from_utf8_lossy(raw)
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let (nickname, trust) = line.rsplit_once(char::is_whitespace)?;
            let nickname = nickname.trim();
            let is_flags = trust.matches(',').count() == 2
                && trust.chars().all(|c| c == ',' || c.is_ascii_alphabetic());
            (is_flags && !nickname.is_empty()).then(|| NssEntry {
                nickname: nickname.to_string(),
                trust: trust.to_string(),
            })
        })
        .collect()
}

/// Trust store backed by an application's NSS database.
#[derive(Debug)]
pub struct NssStore<U = Certutil> {
    utility: U,
    app: App,
    db_dir: PathBuf,
    backups: BackupDirectory,
    verbose_counts: bool,
}

impl<U: NssUtility> NssStore<U> {
    pub fn new(
        utility: U,
        app: App,
        db_dir: impl Into<PathBuf>,
        backups: BackupDirectory,
        verbose_counts: bool,
    ) -> Self {
        Self {
            utility,
            app,
            db_dir: db_dir.into(),
            backups,
            verbose_counts,
        }
    }

    pub const fn app(&self) -> App {
        self.app
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    pub const fn utility(&self) -> &U {
        &self.utility
    }

    pub const fn backups(&self) -> &BackupDirectory {
        &self.backups
    }

    /// Trusted CA certificates in the database.
    pub async fn list(&self) -> Result<Vec<Certificate>> {
        let raw = self.utility.list_nicknames(&self.db_dir).await?;
        let entries = parse_nss_listing(&raw);

        let mut blocks = Vec::new();
        for entry in entries.iter().filter(|e| e.trusted_for_ssl()) {
            let pem = self
                .utility
                .export_certificate(&self.db_dir, &entry.nickname)
                .await?;
            blocks.extend(parse_pem_stream(&pem)?);
        }
        let total = blocks.len();
        let certs = dedup(blocks);

        if self.verbose_counts {
            info!(
                app = %self.app,
                entries = entries.len(),
                trusted = certs.len(),
                "{} database entries, {} trusted CAs",
                entries.len(),
                certs.len()
            );
        }
        debug!(db = %self.db_dir.display(), exported = total, count = certs.len(), "read NSS database");
        Ok(certs)
    }

    /// Copy the certificate database into the application's backup directory.
    pub async fn backup(&self) -> Result<PathBuf> {
        let db = self.db_dir.join(CERT_DB);
        if !db.is_file() {
            return Err(TrustError::NotFound(format!(
                "{} certificate database {} does not exist",
                self.app,
                db.display()
            )));
        }
        let snapshot = self.backups.store(&db, Utc::now().timestamp()).await?;
        Ok(snapshot.path)
    }

    /// Copy a snapshot (latest when `target` is `None`) over the database.
    pub async fn restore(&self, target: Option<&Path>) -> Result<PathBuf> {
        let path = self.backups.restore_target(target).await?;
        copy_atomically(&path, &self.db_dir.join(CERT_DB)).await?;
        info!(app = %self.app, snapshot = %path.display(), "restored certificate database");
        Ok(path)
    }

    pub async fn remove(&self, _whitelist: &dyn Whitelist) -> Result<GeneratedPolicy> {
        Err(self.unsupported("whitelisting"))
    }

    pub async fn apply(&self, _policy: &Path) -> Result<()> {
        Err(self.unsupported("applying a policy"))
    }

    fn unsupported(&self, what: &str) -> TrustError {
        TrustError::Config(format!(
            "{what} is not supported for the {} trust store",
            self.app
        ))
    }
}

/// The NSS directory an application uses on `platform`.
///
/// Firefox: the first profile (by name) holding a `cert9.db`.
pub fn locate_db(app: App, platform: Platform) -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TrustError::Config("could not determine home directory".into()))?;

    match (app, platform) {
        (App::Firefox, Platform::Linux) => first_profile(&home.join(".mozilla/firefox")),
        (App::Firefox, Platform::Darwin) => {
            first_profile(&home.join("Library/Application Support/Firefox/Profiles"))
        }
        (App::Chrome, Platform::Linux) => {
            let db = home.join(".pki/nssdb");
            if db.join(CERT_DB).is_file() {
                Ok(db)
            } else {
                Err(TrustError::NotFound(format!(
                    "no chrome NSS database at {}",
                    db.display()
                )))
            }
        }
        (App::Chrome, Platform::Darwin) => Err(TrustError::Config(
            "chrome uses the system keychain on darwin".into(),
        )),
    }
}

fn first_profile(profiles: &Path) -> Result<PathBuf> {
    let dir = match std::fs::read_dir(profiles) {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TrustError::NotFound(format!(
                "no firefox profiles directory at {}",
                profiles.display()
            )));
        }
        Err(e) => return Err(TrustError::io(profiles, e)),
    };
    let mut candidates: Vec<PathBuf> = dir
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|dir| dir.join(CERT_DB).is_file())
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        TrustError::NotFound(format!(
            "no firefox profile with a {CERT_DB} under {}",
            profiles.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{generated_pem, FakeCertutil};
    use tempfile::TempDir;
    use trustkeep_core::FingerprintWhitelist;

    const LISTING: &str = "\
Certificate Nickname                                         Trust Attributes
                                                             SSL,S/MIME,JAR/XPI

Corp Root CA                                                 CT,C,C
Lab Intermediate                                             c,,
my-client-cert                                               u,u,u
Staging Root                                                 C,,
";

    struct Fixture {
        tmp: TempDir,
        store: NssStore<FakeCertutil>,
        certs: Vec<Certificate>,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let db = tmp.path().join("profile.default");
        std::fs::create_dir_all(&db).unwrap();
        std::fs::write(db.join(CERT_DB), b"sqlite format 3").unwrap();

        let (pem_corp, corp) = generated_pem("Corp Root CA", &[1]);
        let (pem_staging, staging) = generated_pem("Staging Root", &[2]);
        let (pem_lab, _) = generated_pem("Lab Intermediate", &[3]);
        let utility = FakeCertutil::new(LISTING)
            .with_cert("Corp Root CA", pem_corp)
            .with_cert("Staging Root", pem_staging)
            .with_cert("Lab Intermediate", pem_lab);

        let store = NssStore::new(
            utility,
            App::Firefox,
            &db,
            BackupDirectory::new(tmp.path().join("backups"), "db"),
            false,
        );
        Fixture {
            tmp,
            store,
            certs: vec![corp, staging],
        }
    }

    #[test]
    fn test_parse_listing_skips_headers() {
        let entries = parse_nss_listing(LISTING.as_bytes());
        let names: Vec<_> = entries.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(
            names,
            ["Corp Root CA", "Lab Intermediate", "my-client-cert", "Staging Root"]
        );
        assert_eq!(entries[0].trust, "CT,C,C");
    }

    #[test]
    fn test_trusted_for_ssl_reads_first_field() {
        let entry = |trust: &str| NssEntry {
            nickname: "x".into(),
            trust: trust.into(),
        };
        assert!(entry("CT,C,C").trusted_for_ssl());
        assert!(entry("C,,").trusted_for_ssl());
        assert!(!entry("c,,").trusted_for_ssl());
        assert!(!entry(",C,C").trusted_for_ssl());
        assert!(!entry("u,u,u").trusted_for_ssl());
    }

    #[tokio::test]
    async fn test_list_exports_only_trusted_cas() {
        let f = fixture();
        assert_eq!(f.store.list().await.unwrap(), f.certs);
        assert_eq!(
            f.store.utility().exported(),
            vec!["Corp Root CA".to_string(), "Staging Root".to_string()]
        );
    }

    #[tokio::test]
    async fn test_list_fails_when_certutil_fails() {
        let mut f = fixture();
        f.store.utility.fail_listing = true;
        assert!(f.store.list().await.unwrap_err().is_execution());
    }

    #[tokio::test]
    async fn test_backup_and_restore_database() {
        let f = fixture();
        let db = f.store.db_dir().join(CERT_DB);

        let snapshot = f.store.backup().await.unwrap();
        assert_eq!(snapshot.parent().unwrap(), f.tmp.path().join("backups"));
        assert!(snapshot.to_string_lossy().ends_with(".db"));

        std::fs::write(&db, b"clobbered").unwrap();
        let restored = f.store.restore(None).await.unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(std::fs::read(&db).unwrap(), b"sqlite format 3");
    }

    #[tokio::test]
    async fn test_backup_without_database_is_not_found() {
        let f = fixture();
        std::fs::remove_file(f.store.db_dir().join(CERT_DB)).unwrap();
        assert!(f.store.backup().await.unwrap_err().is_not_found());
        assert!(f.store.backups().latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_trimming_is_a_config_error() {
        let f = fixture();
        let none = FingerprintWhitelist::default();
        assert!(matches!(
            f.store.remove(&none).await.unwrap_err(),
            TrustError::Config(_)
        ));
        assert!(matches!(
            f.store.apply(Path::new("/tmp/policy.pem")).await.unwrap_err(),
            TrustError::Config(_)
        ));
    }

    #[test]
    fn test_first_profile_sorted_with_database() {
        let tmp = TempDir::new().unwrap();
        for name in ["zz.default", "aa.empty", "mm.default-release"] {
            std::fs::create_dir_all(tmp.path().join(name)).unwrap();
        }
        std::fs::write(tmp.path().join("zz.default").join(CERT_DB), b"").unwrap();
        std::fs::write(tmp.path().join("mm.default-release").join(CERT_DB), b"").unwrap();

        assert_eq!(
            first_profile(tmp.path()).unwrap(),
            tmp.path().join("mm.default-release")
        );
    }

    #[test]
    fn test_first_profile_without_database_is_not_found() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("aa.empty")).unwrap();
        assert!(first_profile(tmp.path()).unwrap_err().is_not_found());
        assert!(first_profile(&tmp.path().join("missing"))
            .unwrap_err()
            .is_not_found());
    }
}
