//! arrdesk - backend for an *arr companion desktop app
//!
//! This crate provides the command surface the UI binds to:
//! - Settings and instance profiles (backed by `arrdesk-store`)
//! - Profiles and download clients on a saved instance (backed by
//!   `arrdesk-starr`)
//! - Update check, verified download and installer handoff (backed by
//!   `arrdesk-updater`)
//! - Version and quit
//! - Dialog and shell pass-throughs, and the language list
//!
//! The `arrdesk` binary exposes the same operations as a CLI.

pub mod app;
pub mod cli;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod output;
pub mod process;
pub mod shell;

#[cfg(test)]
mod proptests;

pub use app::{App, Services};
pub use cli::Cli;
pub use error::{AppError, ErrorKind, ErrorReply};
pub use logging::LogHandle;
pub use output::{JsonResponse, OutputFormat, OutputFormatter};
pub use process::{AppVersion, ExitHandler, ProcessControl, ProcessExit};
pub use shell::{Dialogs, ScriptedDialogs, Shell, SystemShell, TerminalDialogs};

/// Exit codes for CLI operations
///
/// - 0: Success
/// - 1: General error
/// - 2: Not found - instance, installer or path missing
/// - 3: Timeout - update check or download took too long
/// - 4: Network error - release feed or artifact host unreachable
/// - 5: Invalid input - bad arguments, option or value
/// - 6: Conflict - name mismatch, instance in use, or no pending update
/// - 7: Integrity failed - downloaded artifact did not verify
/// - 8: Storage error - settings or instances could not be read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Something referenced does not exist (exit code 2)
    NotFound = 2,
    /// Operation timed out (exit code 3)
    Timeout = 3,
    /// Network failure (exit code 4)
    NetworkError = 4,
    /// Invalid input provided (exit code 5)
    InvalidInput = 5,
    /// State does not allow the operation (exit code 6)
    Conflict = 6,
    /// Artifact verification failed (exit code 7)
    IntegrityFailed = 7,
    /// Persistent storage failed (exit code 8)
    StorageError = 8,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::NotFound => "NOT_FOUND",
            ExitCode::Timeout => "TIMEOUT",
            ExitCode::NetworkError => "NETWORK_ERROR",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::Conflict => "CONFLICT",
            ExitCode::IntegrityFailed => "INTEGRITY_FAILED",
            ExitCode::StorageError => "STORAGE_ERROR",
        }
    }

    /// Get a human-readable description of the exit code
    pub fn description(&self) -> &'static str {
        match self {
            ExitCode::Success => "Operation completed successfully",
            ExitCode::GeneralError => "An unspecified error occurred",
            ExitCode::NotFound => "Instance, installer or path not found",
            ExitCode::Timeout => "Operation timed out",
            ExitCode::NetworkError => "Could not reach the release server",
            ExitCode::InvalidInput => "Invalid arguments or data provided",
            ExitCode::Conflict => "Current state does not allow the operation",
            ExitCode::IntegrityFailed => "Downloaded update failed verification",
            ExitCode::StorageError => "Settings or instances could not be read or written",
        }
    }
}
