//! # arrdesk-updater
//!
//! Self-update pipeline for arrdesk.
//!
//! This crate handles:
//! - Checking a release feed for a newer version (semver ordering)
//! - Picking the release asset for the running platform
//! - Streaming the artifact into a staging directory with SHA-256 and size
//!   verification
//! - Handing off to the installer as a detached process
//!
//! ## Integrity
//!
//! - A download is only renamed to its final name after it verifies
//! - Interrupted or timed-out downloads leave no staged artifact behind
//! - Digests are compared in constant time
//! - A staged artifact is verified again before it is launched

pub mod artifact;
pub mod channel;
pub mod checker;
pub mod config;
pub mod download;
pub mod error;
pub mod launch;
pub mod manager;
#[cfg(test)]
mod proptests;
pub mod release;

// Re-export main types for convenience
pub use artifact::ArtifactVerifier;
pub use channel::ReleaseChannel;
pub use checker::{HttpReleaseSource, ReleaseSource, UpdateChecker};
pub use config::{FeedConfig, UpdateConfig};
pub use download::{DownloadProgress, Downloader, ProgressCallback};
pub use error::UpdateError;
pub use launch::InstallerLauncher;
pub use manager::{UpdateInfo, UpdatePipeline, UpdateState};
pub use release::{current_platform, FeedRelease, Platform, Release, ReleaseAsset};
