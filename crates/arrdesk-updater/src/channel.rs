//! Release channels.
//!
//! # Channels
//!
//! - **Production**: tagged releases, most tested
//! - **Unstable**: builds from the main branch
//!
//! The `updates` setting selects the channel by name. Each named channel maps
//! to a feed URL in [`UpdateConfig`](crate::config::UpdateConfig).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::UpdateConfig;
use crate::error::UpdateError;

/// Release track the checker queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseChannel {
    /// Tagged releases
    #[default]
    Production,
    /// Main-branch builds, may have bugs
    Unstable,
}

impl ReleaseChannel {
    /// Feed URL for this channel.
    pub fn feed_url(&self, config: &UpdateConfig) -> String {
        match self {
            Self::Production => config.feeds.production.clone(),
            Self::Unstable => config.feeds.unstable.clone(),
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Unstable => write!(f, "unstable"),
        }
    }
}

impl FromStr for ReleaseChannel {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "production" => Ok(Self::Production),
            "unstable" => Ok(Self::Unstable),
            other => Err(UpdateError::Config(format!("unknown release channel: {other}"))),
        }
    }
}
