//! Boundary to the native trust-management executables.
//!
//! Implementations hand back raw bytes and never parse them. Every call is
//! a single subprocess run to completion under a timeout.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use trustkeep_core::{Result, TrustError};

use crate::config::StoreConfig;

/// Operations consumed from the platform trust tool.
#[async_trait]
pub trait TrustUtility: Send + Sync {
    /// Dump every installed certificate as concatenated PEM, optionally
    /// restricted to the given keychains.
    async fn find_certificates(&self, keychains: &[PathBuf]) -> Result<Vec<u8>>;

    /// Write the current trust policy document to `dest`.
    async fn export_policy(&self, dest: &Path) -> Result<()>;

    /// Replace the trust policy with the document at `src`.
    async fn import_policy(&self, src: &Path) -> Result<()>;
}

/// macOS `security(1)`.
#[derive(Debug, Clone)]
pub struct SecurityCli {
    program: PathBuf,
    timeout: Duration,
}

impl SecurityCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.security_program, config.command_timeout())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>> {
        run_tool(&self.program, self.timeout, args).await
    }
}

#[async_trait]
impl TrustUtility for SecurityCli {
    async fn find_certificates(&self, keychains: &[PathBuf]) -> Result<Vec<u8>> {
        let mut args: Vec<OsString> = vec!["find-certificate".into(), "-a".into(), "-p".into()];
        args.extend(keychains.iter().map(|k| k.as_os_str().to_owned()));
        self.run(args).await
    }

    async fn export_policy(&self, dest: &Path) -> Result<()> {
        let args = vec![
            "trust-settings-export".into(),
            "-s".into(),
            dest.as_os_str().to_owned(),
        ];
        self.run(args).await.map(drop)
    }

    async fn import_policy(&self, src: &Path) -> Result<()> {
        let args = vec![
            "trust-settings-import".into(),
            "-d".into(),
            src.as_os_str().to_owned(),
        ];
        self.run(args).await.map(drop)
    }
}

/// Run `program` to completion under `timeout`, returning stdout.
async fn run_tool(program: &Path, timeout: Duration, args: Vec<OsString>) -> Result<Vec<u8>> {
    debug!(program = %program.display(), ?args, "running trust utility");

    let mut cmd = Command::new(program);
    cmd.args(&args).stdin(Stdio::null()).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| TrustError::Timeout {
            program: program.display().to_string(),
            secs: timeout.as_secs(),
        })?
        .map_err(|e| TrustError::spawn(program, &e))?;

    if !output.status.success() {
        return Err(TrustError::exit(program, output.status.code(), &output.stderr));
    }
    Ok(output.stdout)
}

/// Operations consumed from NSS `certutil` for application databases.
#[async_trait]
pub trait NssUtility: Send + Sync {
    /// The nickname / trust-attribute table of the database in `db`.
    async fn list_nicknames(&self, db: &Path) -> Result<Vec<u8>>;

    /// One certificate from `db` as PEM.
    async fn export_certificate(&self, db: &Path, nickname: &str) -> Result<Vec<u8>>;
}

/// NSS `certutil(1)`.
#[derive(Debug, Clone)]
pub struct Certutil {
    program: PathBuf,
    timeout: Duration,
}

impl Certutil {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(&config.certutil_program, config.command_timeout())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn sql_db(db: &Path) -> OsString {
    let mut arg = OsString::from("sql:");
    arg.push(db.as_os_str());
    arg
}

#[async_trait]
impl NssUtility for Certutil {
    async fn list_nicknames(&self, db: &Path) -> Result<Vec<u8>> {
        let args = vec!["-L".into(), "-d".into(), sql_db(db)];
        run_tool(&self.program, self.timeout, args).await
    }

    async fn export_certificate(&self, db: &Path, nickname: &str) -> Result<Vec<u8>> {
        let args = vec![
            "-L".into(),
            "-d".into(),
            sql_db(db),
            "-n".into(),
            nickname.into(),
            "-a".into(),
        ];
        run_tool(&self.program, self.timeout, args).await
    }
}
