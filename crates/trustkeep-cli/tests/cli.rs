//! End-to-end tests for the `trustkeep` binary.
//!
//! Every test pins the Linux bundle backend to files inside a temp dir, so
//! nothing touches the real trust store on any host.

use assert_cmd::Command;
use predicates::prelude::*;
use rcgen::{CertificateParams, DnType, KeyPair};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use trustkeep_core::Certificate;

struct Sandbox {
    dir: TempDir,
    config: PathBuf,
    bundle: PathBuf,
    backups: PathBuf,
    certs: Vec<Certificate>,
}

fn mint(cn: &str) -> (String, Certificate) {
    let key_pair = KeyPair::generate().unwrap();
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name.push(DnType::CommonName, cn);
    let cert = params.self_signed(&key_pair).unwrap();
    (cert.pem(), Certificate::from_der(cert.der()).unwrap())
}

fn sandbox() -> Sandbox {
    let dir = TempDir::new().unwrap();
    let (pem_a, a) = mint("CLI Root A");
    let (pem_b, b) = mint("CLI Root B");

    let bundle = dir.path().join("ca-certificates.crt");
    std::fs::write(&bundle, format!("{pem_a}{pem_b}{pem_a}")).unwrap();

    let backups = dir.path().join("backups");
    let config = dir.path().join("config.toml");
    std::fs::write(
        &config,
        format!(
            "platform = \"linux\"\nca_bundle = {:?}\nbackup_dir = {:?}\n",
            bundle.display().to_string(),
            backups.display().to_string()
        ),
    )
    .unwrap();

    Sandbox {
        dir,
        config,
        bundle,
        backups,
        certs: vec![a, b],
    }
}

fn trustkeep(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("trustkeep").unwrap();
    cmd.arg("--config").arg(config).arg("--no-color").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("trustkeep")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("whitelist"));
}

#[test]
fn test_unknown_command_fails() {
    Command::cargo_bin("trustkeep")
        .unwrap()
        .arg("frobnicate")
        .assert()
        .failure();
}

#[test]
fn test_backup_prints_confirmation() {
    let sb = sandbox();
    trustkeep(&sb.config)
        .arg("backup")
        .assert()
        .success()
        .stdout("Backup completed successfully\n");

    let snapshots: Vec<_> = std::fs::read_dir(&sb.backups)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].starts_with("trust-backup-"));
    assert!(snapshots[0].ends_with(".pem"));
}

#[test]
fn test_list_count_and_json() {
    let sb = sandbox();
    trustkeep(&sb.config)
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("2\n");

    trustkeep(&sb.config)
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(sb.certs[0].fingerprint().as_str()))
        .stdout(predicate::str::contains(sb.certs[1].fingerprint().as_str()));
}

#[test]
fn test_restore_without_backup_fails() {
    let sb = sandbox();
    trustkeep(&sb.config)
        .arg("restore")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no backup"));
}

#[test]
fn test_backup_then_restore_undoes_changes() {
    let sb = sandbox();
    let original = std::fs::read(&sb.bundle).unwrap();

    trustkeep(&sb.config).arg("backup").assert().success();
    std::fs::write(&sb.bundle, b"").unwrap();
    trustkeep(&sb.config).arg("restore").assert().success();

    assert_eq!(std::fs::read(&sb.bundle).unwrap(), original);
}

#[test]
fn test_whitelist_generates_then_applies() {
    let sb = sandbox();
    let whitelist = sb.dir.path().join("whitelist.json");
    std::fs::write(
        &whitelist,
        format!(r#"{{"fingerprints": ["{}"]}}"#, sb.certs[1].fingerprint()),
    )
    .unwrap();

    trustkeep(&sb.config)
        .args(["whitelist", "--file"])
        .arg(&whitelist)
        .assert()
        .success()
        .stdout(predicate::str::contains("Kept 1, dropped 1"));
    // Generating alone leaves the bundle untouched.
    trustkeep(&sb.config)
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("2\n");

    trustkeep(&sb.config)
        .args(["whitelist", "--apply", "--file"])
        .arg(&whitelist)
        .assert()
        .success()
        .stdout(predicate::str::contains("policy applied"));
    trustkeep(&sb.config)
        .args(["list", "--count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_apply_missing_file_fails() {
    let sb = sandbox();
    trustkeep(&sb.config)
        .args(["apply", "/no/such/policy.pem"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_unknown_app_is_rejected() {
    let sb = sandbox();
    trustkeep(&sb.config)
        .args(["list", "--app", "java"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no trust store backend"));
}

/// A Firefox profile read through a stand-in `certutil` script.
#[cfg(unix)]
#[test]
fn test_firefox_list_and_backup() {
    use std::os::unix::fs::PermissionsExt;

    let sb = sandbox();
    let nss = sb.dir.path().join("nss");
    let profile = sb.dir.path().join("abc.default-release");
    std::fs::create_dir_all(&nss).unwrap();
    std::fs::create_dir_all(&profile).unwrap();
    std::fs::write(profile.join("cert9.db"), b"sqlite format 3").unwrap();

    let (pem_corp, _) = mint("Corp Root");
    let (pem_staging, _) = mint("Staging Root");
    std::fs::write(nss.join("CorpRoot.pem"), pem_corp).unwrap();
    std::fs::write(nss.join("StagingRoot.pem"), pem_staging).unwrap();
    std::fs::write(
        nss.join("listing.txt"),
        "Certificate Nickname    Trust Attributes\n\
         \x20                       SSL,S/MIME,JAR/XPI\n\n\
         CorpRoot                CT,C,C\n\
         StagingRoot             C,,\n\
         my-client               u,u,u\n",
    )
    .unwrap();

    // certutil -L -d sql:<db> [-n <nickname> -a]
    let certutil = nss.join("certutil");
    std::fs::write(
        &certutil,
        "#!/bin/sh\ndir=$(dirname \"$0\")\n\
         if [ \"$4\" = \"-n\" ]; then cat \"$dir/$5.pem\"; else cat \"$dir/listing.txt\"; fi\n",
    )
    .unwrap();
    std::fs::set_permissions(&certutil, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = sb.dir.path().join("firefox.toml");
    std::fs::write(
        &config,
        format!(
            "platform = \"linux\"\nbackup_dir = {:?}\ncertutil_program = {:?}\nnss_db = {:?}\n",
            sb.backups.display().to_string(),
            certutil.display().to_string(),
            profile.display().to_string()
        ),
    )
    .unwrap();

    trustkeep(&config)
        .args(["list", "--app", "firefox", "--count"])
        .assert()
        .success()
        .stdout("2\n");

    trustkeep(&config)
        .args(["backup", "--app", "firefox"])
        .assert()
        .success()
        .stdout("Backup completed successfully\n");

    let snapshots: Vec<_> = std::fs::read_dir(sb.backups.join("firefox"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].starts_with("trust-backup-"));
    assert!(snapshots[0].ends_with(".db"));
}
