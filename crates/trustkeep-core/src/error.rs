use std::path::Path;
use thiserror::Error;

/// Result type alias for trust store operations
pub type Result<T> = std::result::Result<T, TrustError>;

/// Errors that can occur while reading or changing a trust store
#[derive(Error, Debug)]
pub enum TrustError {
    /// The native trust utility failed to start or exited non-zero
    #[error("{program} failed: {detail}")]
    Execution {
        /// Program that was invoked
        program: String,
        /// Exit status and captured stderr, or the spawn error
        detail: String,
    },

    /// The native trust utility did not finish in time
    #[error("{program} timed out after {secs} seconds")]
    Timeout {
        /// Program that was invoked
        program: String,
        /// Configured timeout
        secs: u64,
    },

    /// A policy document or certificate stream was malformed
    #[error("decode error: {0}")]
    Decode(String),

    /// Filesystem failure (temp files, backup directory, copies)
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// No backup snapshot available and no explicit target given
    #[error("not found: {0}")]
    NotFound(String),

    /// An explicitly requested target is unusable
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl TrustError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// The utility could not be spawned at all.
    pub fn spawn(program: impl AsRef<Path>, err: &std::io::Error) -> Self {
        Self::Execution {
            program: program.as_ref().display().to_string(),
            detail: format!("could not start: {err}"),
        }
    }

    /// The utility ran but reported failure.
    pub fn exit(program: impl AsRef<Path>, status: Option<i32>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr);
        let status = status.map_or_else(|| "signal".to_string(), |code| code.to_string());
        Self::Execution {
            program: program.as_ref().display().to_string(),
            detail: format!("exit status {status}: {}", stderr.trim()),
        }
    }

    /// Shorthand for a decode failure.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode(reason.into())
    }

    /// Returns true if no backup could be located
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if an explicit target was rejected
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the native utility misbehaved
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::Timeout { .. })
    }
}
