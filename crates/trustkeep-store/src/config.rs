//! Backend configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use trustkeep_core::{Result, TrustError};

/// Platform trust database flavors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// macOS keychains plus `security` trust settings
    Darwin,
    /// Distribution CA bundle file
    Linux,
}

impl Platform {
    /// The platform this binary was built for, if supported.
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(Self::Darwin)
        } else if cfg!(target_os = "linux") {
            Some(Self::Linux)
        } else {
            None
        }
    }

    /// Extension used for snapshot files.
    pub const fn backup_extension(self) -> &'static str {
        match self {
            Self::Darwin => "xml",
            Self::Linux => "pem",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Darwin => write!(f, "darwin"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

/// Applications that keep a trust database of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum App {
    /// Per-profile NSS database
    Firefox,
    /// Shared NSS database on Linux, the system keychain on macOS
    Chrome,
}

impl App {
    pub const SUPPORTED: &'static [&'static str] = &["firefox", "chrome"];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
        }
    }

    /// Extension used for snapshots of the application's certificate database.
    pub const fn backup_extension(self) -> &'static str {
        "db"
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for App {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "firefox" => Ok(Self::Firefox),
            "chrome" | "chromium" => Ok(Self::Chrome),
            _ => Err(TrustError::Config(format!(
                "no trust store backend for application `{s}` (supported: {})",
                Self::SUPPORTED.join(", ")
            ))),
        }
    }
}

/// Settings a trust store backend is constructed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Force a platform instead of detecting it.
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Log installed vs. policy-listed counts during `list`.
    #[serde(default)]
    pub verbose_counts: bool,

    /// Where snapshots live (default: per-user directory).
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Upper bound on each native tool invocation.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Path to the macOS `security` tool.
    #[serde(default = "default_security_program")]
    pub security_program: PathBuf,

    /// Keychains whose certificates `list` considers.
    #[serde(default = "default_keychains")]
    pub keychains: Vec<PathBuf>,

    /// CA bundle used by the Linux backend (default: first one found).
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,

    /// NSS `certutil` used for application stores.
    #[serde(default = "default_certutil_program")]
    pub certutil_program: PathBuf,

    /// NSS database directory for `--app` (default: the application's own).
    #[serde(default)]
    pub nss_db: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            platform: None,
            verbose_counts: false,
            backup_dir: None,
            command_timeout_secs: default_command_timeout_secs(),
            security_program: default_security_program(),
            keychains: default_keychains(),
            ca_bundle: None,
            certutil_program: default_certutil_program(),
            nss_db: None,
        }
    }
}

impl StoreConfig {
    /// Configured platform, or the build target.
    pub fn platform(&self) -> Result<Platform> {
        self.platform
            .or_else(Platform::current)
            .ok_or_else(|| TrustError::Config("no trust store backend for this platform".into()))
    }

    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

// Default value functions for serde.
const fn default_command_timeout_secs() -> u64 {
    60
}

fn default_security_program() -> PathBuf {
    PathBuf::from("/usr/bin/security")
}

fn default_certutil_program() -> PathBuf {
    PathBuf::from("certutil")
}

// The login keychain is left out on purpose: users and their apps edit it.
fn default_keychains() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/System/Library/Keychains/SystemRootCertificates.keychain"),
        PathBuf::from("/Library/Keychains/System.keychain"),
    ]
}
