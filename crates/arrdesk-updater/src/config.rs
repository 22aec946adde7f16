//! Configuration for the update pipeline.
//!
//! Bootstrap settings that users rarely touch: where the release feeds live,
//! how long a download may take, and what the HTTP client calls itself.
//! The per-user `updates`, `download_dir` and `request_timeout_secs` settings
//! override parts of this at runtime.
//!
//! # Example TOML
//!
//! ```toml
//! download_timeout_secs = 600
//! user_agent = "arrdesk-updater/0.1.0"
//!
//! [feeds]
//! production = "https://api.github.com/repos/arrdesk/arrdesk/releases/latest"
//! unstable = "https://unstable.arrdesk.io/releases/latest.json"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::UpdateError;

/// Main update configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Feed URL for each named channel
    #[serde(default)]
    pub feeds: FeedConfig,

    /// Timeout for the release feed request in seconds
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    /// Timeout for a whole artifact download in seconds
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            feeds: FeedConfig::default(),
            check_timeout_secs: default_check_timeout(),
            download_timeout_secs: default_download_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl UpdateConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| UpdateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, UpdateError> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "No updater config, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), UpdateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| UpdateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), UpdateError> {
        for (name, url) in [
            ("production", &self.feeds.production),
            ("unstable", &self.feeds.unstable),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(UpdateError::Config(format!(
                    "feed url for {name} must be http(s): {url}"
                )));
            }
        }
        if self.download_timeout_secs == 0 || self.check_timeout_secs == 0 {
            return Err(UpdateError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Build the HTTP client shared by the checker and the downloader.
    pub fn http_client(&self) -> Result<reqwest::Client, UpdateError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout())
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| UpdateError::Config(format!("failed to create HTTP client: {e}")))
    }
}

/// Feed URLs per named channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_production_feed")]
    pub production: String,
    #[serde(default = "default_unstable_feed")]
    pub unstable: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            production: default_production_feed(),
            unstable: default_unstable_feed(),
        }
    }
}

// Default value functions for serde
fn default_production_feed() -> String {
    "https://api.github.com/repos/arrdesk/arrdesk/releases/latest".to_string()
}

fn default_unstable_feed() -> String {
    "https://unstable.arrdesk.io/releases/latest.json".to_string()
}

fn default_check_timeout() -> u64 {
    30
}

fn default_download_timeout() -> u64 {
    600
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("arrdesk-updater/{}", env!("CARGO_PKG_VERSION"))
}
