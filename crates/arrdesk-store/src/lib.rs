//! # arrdesk-store
//!
//! Persistence for the arrdesk backend.
//!
//! This crate handles:
//! - The global [`Settings`] document with field-scoped saves ([`ConfigStore`])
//! - Named *arr instance profiles keyed by integer id ([`InstanceStore`])
//! - Tagged config values validated against a per-option schema
//! - Atomic whole-file replacement for every durable write
//!
//! ## Durability
//!
//! Every successful mutation is on disk before the call returns. A failed
//! flush leaves the in-memory state exactly as it was before the call.

pub mod atomic;
pub mod config_store;
pub mod error;
pub mod instance;
pub mod instance_store;
pub mod paths;
#[cfg(test)]
mod proptests;
pub mod settings;
pub mod value;

pub use config_store::{ConfigSaved, ConfigStore};
pub use error::StoreError;
pub use instance::{AppConfig, StarrApp};
pub use instance_store::{InstancePolicy, InstanceStore, SavedInstance};
pub use paths::AppPaths;
pub use settings::{OptionKind, OptionSpec, Settings, OPTIONS};
pub use value::ConfigValue;
