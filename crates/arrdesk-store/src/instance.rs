//! Instance profile payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::StoreError;

/// Longest accepted instance label.
const MAX_NAME_LEN: usize = 64;

/// The *arr application an instance points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StarrApp {
    Lidarr,
    Prowlarr,
    Radarr,
    Readarr,
    Sonarr,
    Whisparr,
}

impl StarrApp {
    pub const ALL: [StarrApp; 6] = [
        Self::Lidarr,
        Self::Prowlarr,
        Self::Radarr,
        Self::Readarr,
        Self::Sonarr,
        Self::Whisparr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lidarr => "lidarr",
            Self::Prowlarr => "prowlarr",
            Self::Radarr => "radarr",
            Self::Readarr => "readarr",
            Self::Sonarr => "sonarr",
            Self::Whisparr => "whisparr",
        }
    }

    /// Default port the application listens on.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Lidarr => 8686,
            Self::Prowlarr => 9696,
            Self::Radarr => 7878,
            Self::Readarr => 8787,
            Self::Sonarr => 8989,
            Self::Whisparr => 6969,
        }
    }
}

impl fmt::Display for StarrApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StarrApp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|app| app.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown app: {s}"))
    }
}

/// Connection profile for one *arr instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: StarrApp,
    /// User-visible label; removal must quote it.
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub valid_ssl: bool,
}

fn default_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Create a profile with default credentials and timeouts.
    pub fn new(app: StarrApp, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            app,
            name: name.into(),
            url: url.into(),
            api_key: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
            valid_ssl: true,
        }
    }

    /// Check the profile before it is stored.
    pub fn validate(&self) -> Result<(), StoreError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("name must not be empty".to_string()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(StoreError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| StoreError::Validation(format!("invalid url '{}': {e}", self.url)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(StoreError::Validation(format!(
                "invalid url '{}': must start with http:// or https://",
                self.url
            )));
        }
        if url.host_str().is_none() {
            return Err(StoreError::Validation(format!(
                "invalid url '{}': missing host",
                self.url
            )));
        }

        if !self.api_key.is_empty()
            && (self.api_key.len() != 32 || !self.api_key.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(StoreError::Validation(
                "api_key must be 32 hexadecimal characters".to_string(),
            ));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(StoreError::Validation(
                "timeout_secs must be between 1 and 600".to_string(),
            ));
        }

        Ok(())
    }
}
