//! Error types for *arr API calls.

use arrdesk_store::StarrApp;
use thiserror::Error;

use crate::resource::Resource;

/// Errors returned by [`StarrClient`](crate::StarrClient) and the transfer
/// helpers.
#[derive(Debug, Error)]
pub enum StarrError {
    /// The instance could not be reached
    #[error("request failed: {0}")]
    Request(String),

    /// The instance did not answer within its timeout
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The instance answered with a non-success status
    #[error("{app} answered {status}: {message}")]
    Status {
        app: StarrApp,
        status: u16,
        message: String,
    },

    /// The response body was not what the API documents
    #[error("parse error: {0}")]
    Parse(String),

    /// The app has no such resource
    #[error("{app} has no {resource}")]
    Unsupported { app: StarrApp, resource: Resource },

    /// The instance profile cannot be used to build a client
    #[error("instance configuration error: {0}")]
    Config(String),

    /// An export file does not belong to this app or resource
    #[error("export mismatch: {0}")]
    Mismatch(String),

    /// Reading or writing an export file failed
    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl StarrError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout { .. } | Self::Disk(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for StarrError {
    fn from(err: serde_json::Error) -> Self {
        StarrError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(StarrError::Timeout { secs: 15 }.is_retryable());
        assert!(StarrError::Request("refused".into()).is_retryable());
        assert!(StarrError::Status {
            app: StarrApp::Sonarr,
            status: 502,
            message: "bad gateway".into(),
        }
        .is_retryable());
        assert!(!StarrError::Status {
            app: StarrApp::Sonarr,
            status: 401,
            message: "Unauthorized".into(),
        }
        .is_retryable());
        assert!(!StarrError::Unsupported {
            app: StarrApp::Prowlarr,
            resource: Resource::QualityProfiles,
        }
        .is_retryable());
    }

    #[test]
    fn test_unsupported_message() {
        let err = StarrError::Unsupported {
            app: StarrApp::Radarr,
            resource: Resource::MetadataProfiles,
        };
        assert_eq!(err.to_string(), "radarr has no metadata profiles");
    }
}
