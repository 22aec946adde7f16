//! Update checking.
//!
//! The checker asks a [`ReleaseSource`] for the latest release on a feed and
//! compares it with the running version. It never touches disk.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use semver::Version;
use tracing::{debug, info};

use crate::error::UpdateError;
use crate::release::{current_platform, FeedRelease, Platform, Release};

/// Where release information comes from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch the latest release published on `feed_url`.
    async fn latest(&self, feed_url: &str) -> Result<FeedRelease, UpdateError>;
}

/// Release source that reads a JSON feed over HTTP.
pub struct HttpReleaseSource {
    client: reqwest::Client,
}

impl HttpReleaseSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReleaseSource for HttpReleaseSource {
    async fn latest(&self, feed_url: &str) -> Result<FeedRelease, UpdateError> {
        debug!(url = feed_url, "Fetching release feed");

        let response = self
            .client
            .get(feed_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json, application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: feed_url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let release: FeedRelease = serde_json::from_slice(&body)?;
        debug!(tag = %release.tag_name, assets = release.assets.len(), "Release feed parsed");
        Ok(release)
    }
}

/// Compares the latest published release with the running version.
pub struct UpdateChecker {
    source: Arc<dyn ReleaseSource>,
    current_version: Version,
    platform: Platform,
}

impl UpdateChecker {
    /// Create a checker for the platform this binary was built for.
    pub fn new(source: Arc<dyn ReleaseSource>, current_version: Version) -> Self {
        Self::with_platform(source, current_version, current_platform())
    }

    pub fn with_platform(
        source: Arc<dyn ReleaseSource>,
        current_version: Version,
        platform: Platform,
    ) -> Self {
        Self {
            source,
            current_version,
            platform,
        }
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Check `feed_url` for a newer release.
    ///
    /// Returns the up-to-date sentinel when the feed's version is not newer.
    ///
    /// # Errors
    ///
    /// - `Network` / `HttpStatus` if the feed cannot be fetched
    /// - `Timeout` if the feed does not answer within `timeout`
    /// - `Parse` if the feed or its version is malformed
    /// - `NoAsset` if a newer release has nothing for this platform
    pub async fn check(&self, feed_url: &str, timeout: Duration) -> Result<Release, UpdateError> {
        let feed = tokio::time::timeout(timeout, self.source.latest(feed_url))
            .await
            .map_err(|_| UpdateError::Timeout {
                operation: "update check",
                secs: timeout.as_secs(),
            })??;

        let release = feed.into_release(&self.current_version, &self.platform)?;
        if release.update_available {
            info!(
                current = %self.current_version,
                latest = %release.version,
                "Update available"
            );
        } else {
            info!(current = %self.current_version, "No update available");
        }
        Ok(release)
    }
}
