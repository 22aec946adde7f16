//! Error types for the update pipeline.

use thiserror::Error;

/// Errors that can occur during update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The release feed or artifact host could not be reached
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The operation did not finish within its time limit
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The release feed or a version string could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Artifact size does not match the release
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Artifact hash does not match the release
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Local file system error while staging
    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),

    /// Download requested before a check found an update
    #[error("no pending update; run an update check first")]
    NoPendingUpdate,

    /// The release has no artifact for this platform
    #[error("no release asset for platform {0}")]
    NoAsset(String),

    /// The installer path does not exist
    #[error("installer not found: {0}")]
    NotFound(String),

    /// The installer path is not something this platform can run
    #[error("not an executable installer: {0}")]
    NotExecutable(String),

    /// Spawning the installer failed
    #[error("failed to launch installer: {0}")]
    Launch(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl UpdateError {
    /// Whether the artifact failed verification.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::SizeMismatch { .. } | Self::HashMismatch { .. })
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        UpdateError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for UpdateError {
    fn from(err: serde_json::Error) -> Self {
        UpdateError::Parse(err.to_string())
    }
}

impl From<semver::Error> for UpdateError {
    fn from(err: semver::Error) -> Self {
        UpdateError::Parse(err.to_string())
    }
}
