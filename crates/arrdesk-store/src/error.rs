//! Error types for the settings and instance stores.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is not a recognized settings option
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// The value does not match the option's expected kind
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// An instance configuration failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// No instance with the given id exists
    #[error("instance {0} not found")]
    NotFound(i64),

    /// The instance label does not match the name given for removal
    #[error("instance {id} is named '{actual}', not '{given}'")]
    NameMismatch {
        id: i64,
        given: String,
        actual: String,
    },

    /// The instance is active and policy forbids removing it
    #[error("instance {0} is active and cannot be removed")]
    InUse(i64),

    /// The backing document could not be read and nothing is loaded yet
    #[error("{store} storage unavailable: {reason}")]
    StorageUnavailable { store: &'static str, reason: String },

    /// Writing the document to disk failed
    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),

    /// Serializing the document failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Build a `StorageUnavailable` error for the named store.
    pub fn unavailable(store: &'static str, reason: impl std::fmt::Display) -> Self {
        StoreError::StorageUnavailable {
            store,
            reason: reason.to_string(),
        }
    }

    /// Build an `InvalidValue` error for the given key.
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        StoreError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
