//! Application-level errors and their UI representation.
//!
//! Library crates return their own error enums. Everything that crosses the
//! command surface is an [`AppError`], which the UI receives as an
//! [`ErrorReply`]: a stable machine-readable kind, the message, and whether
//! retrying the same call may succeed.

use arrdesk_starr::StarrError;
use arrdesk_store::StoreError;
use arrdesk_updater::UpdateError;
use serde::Serialize;
use thiserror::Error;

use crate::ExitCode;

/// Errors returned by [`App`](crate::App) operations.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    Starr(#[from] StarrError),

    /// A dialog could not be shown or answered
    #[error("dialog failed: {0}")]
    Dialog(String),

    /// An OS shell action failed
    #[error("shell action failed: {0}")]
    Shell(String),

    /// The action has no implementation on this platform
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    /// A path returned by a chooser or given by the caller does not exist
    #[error("path does not exist: {0}")]
    PathNotFound(String),

    /// Bad arguments from the caller
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Local file system error outside the stores
    #[error("disk error: {0}")]
    Io(#[from] std::io::Error),
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownOption,
    InvalidValue,
    Validation,
    NotFound,
    NameMismatch,
    InUse,
    StorageUnavailable,
    Network,
    Timeout,
    Remote,
    Parse,
    Integrity,
    Disk,
    NoPendingUpdate,
    ExportMismatch,
    NotExecutable,
    Launch,
    Config,
    Dialog,
    Shell,
    Unsupported,
    InvalidInput,
}

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::UnknownOption
            | Self::InvalidValue
            | Self::Validation
            | Self::InvalidInput
            | Self::Config => ExitCode::InvalidInput,
            Self::NotFound => ExitCode::NotFound,
            Self::Timeout => ExitCode::Timeout,
            Self::Network | Self::Remote => ExitCode::NetworkError,
            Self::NameMismatch | Self::InUse | Self::NoPendingUpdate | Self::ExportMismatch => {
                ExitCode::Conflict
            }
            Self::Integrity => ExitCode::IntegrityFailed,
            Self::StorageUnavailable | Self::Disk => ExitCode::StorageError,
            Self::Parse
            | Self::NotExecutable
            | Self::Launch
            | Self::Dialog
            | Self::Shell
            | Self::Unsupported => ExitCode::GeneralError,
        }
    }
}

/// What the UI receives when a command fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReply {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Store(e) => match e {
                StoreError::UnknownOption(_) => ErrorKind::UnknownOption,
                StoreError::InvalidValue { .. } => ErrorKind::InvalidValue,
                StoreError::Validation(_) => ErrorKind::Validation,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::NameMismatch { .. } => ErrorKind::NameMismatch,
                StoreError::InUse(_) => ErrorKind::InUse,
                StoreError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
                StoreError::Disk(_) | StoreError::Serialization(_) => ErrorKind::Disk,
            },
            Self::Update(e) => match e {
                UpdateError::Network(_) | UpdateError::HttpStatus { .. } => ErrorKind::Network,
                UpdateError::Timeout { .. } => ErrorKind::Timeout,
                UpdateError::Parse(_) => ErrorKind::Parse,
                UpdateError::SizeMismatch { .. } | UpdateError::HashMismatch { .. } => {
                    ErrorKind::Integrity
                }
                UpdateError::Disk(_) => ErrorKind::Disk,
                UpdateError::NoPendingUpdate => ErrorKind::NoPendingUpdate,
                UpdateError::NoAsset(_) | UpdateError::NotFound(_) => ErrorKind::NotFound,
                UpdateError::NotExecutable(_) => ErrorKind::NotExecutable,
                UpdateError::Launch(_) => ErrorKind::Launch,
                UpdateError::Config(_) => ErrorKind::Config,
            },
            Self::Starr(e) => match e {
                StarrError::Request(_) => ErrorKind::Network,
                StarrError::Timeout { .. } => ErrorKind::Timeout,
                StarrError::Status { .. } => ErrorKind::Remote,
                StarrError::Parse(_) => ErrorKind::Parse,
                StarrError::Unsupported { .. } => ErrorKind::Unsupported,
                StarrError::Config(_) => ErrorKind::Config,
                StarrError::Mismatch(_) => ErrorKind::ExportMismatch,
                StarrError::Disk(_) => ErrorKind::Disk,
            },
            Self::Dialog(_) => ErrorKind::Dialog,
            Self::Shell(_) => ErrorKind::Shell,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::PathNotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Disk,
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Update(e) => e.is_retryable(),
            Self::Starr(e) => e.is_retryable(),
            Self::Store(StoreError::StorageUnavailable { .. } | StoreError::Disk(_)) => true,
            Self::Io(_) => true,
            _ => false,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        self.kind().exit_code()
    }

    pub fn reply(&self) -> ErrorReply {
        ErrorReply {
            kind: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_kinds() {
        let err = AppError::from(StoreError::NameMismatch {
            id: 1,
            given: "X".into(),
            actual: "cfgB".into(),
        });
        assert_eq!(err.kind(), ErrorKind::NameMismatch);
        assert!(!err.is_retryable());
        assert_eq!(err.exit_code(), ExitCode::Conflict);

        let err = AppError::from(StoreError::unavailable("settings", "bad toml"));
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_update_errors_map_to_kinds() {
        let err = AppError::from(UpdateError::Timeout {
            operation: "download",
            secs: 5,
        });
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());

        let err = AppError::from(UpdateError::HashMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(!err.is_retryable());
        assert_eq!(err.exit_code(), ExitCode::IntegrityFailed);

        let err = AppError::from(UpdateError::HttpStatus {
            url: "http://x".into(),
            status: 503,
        });
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_starr_errors_map_to_kinds() {
        let err = AppError::from(StarrError::Status {
            app: arrdesk_store::StarrApp::Sonarr,
            status: 401,
            message: "Unauthorized".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert!(!err.is_retryable());
        assert_eq!(err.exit_code(), ExitCode::NetworkError);
        assert_eq!(err.to_string(), "sonarr answered 401: Unauthorized");

        let err = AppError::from(StarrError::Mismatch("file holds download clients".into()));
        assert_eq!(err.kind(), ErrorKind::ExportMismatch);
        assert_eq!(err.exit_code(), ExitCode::Conflict);

        let err = AppError::from(StarrError::Timeout { secs: 15 });
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
        assert_eq!(err.reply().kind, ErrorKind::Timeout);
    }

    #[test]
    fn test_reply_serializes_snake_case_kind() {
        let reply = AppError::from(UpdateError::NoPendingUpdate).reply();
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["kind"], "no_pending_update");
        assert_eq!(json["retryable"], false);
        assert!(json["message"].as_str().unwrap().contains("no pending update"));
    }
}
