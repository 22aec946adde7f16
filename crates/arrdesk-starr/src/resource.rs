//! The API resources arrdesk manages on an *arr instance.
//!
//! | resource | endpoint | apps |
//! |---|---|---|
//! | quality profiles | `qualityprofile` | all but Prowlarr |
//! | metadata profiles | `metadataprofile` | Lidarr, Readarr |
//! | download clients | `downloadclient` | all |

use std::fmt;
use std::str::FromStr;

use arrdesk_store::StarrApp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    QualityProfiles,
    MetadataProfiles,
    DownloadClients,
}

impl Resource {
    pub const ALL: [Resource; 3] = [
        Self::QualityProfiles,
        Self::MetadataProfiles,
        Self::DownloadClients,
    ];

    /// Path segment under `/api/<version>/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::QualityProfiles => "qualityprofile",
            Self::MetadataProfiles => "metadataprofile",
            Self::DownloadClients => "downloadclient",
        }
    }

    /// Singular name for messages.
    pub fn singular(&self) -> &'static str {
        match self {
            Self::QualityProfiles => "quality profile",
            Self::MetadataProfiles => "metadata profile",
            Self::DownloadClients => "download client",
        }
    }

    pub fn supported_by(&self, app: StarrApp) -> bool {
        match self {
            Self::QualityProfiles => app != StarrApp::Prowlarr,
            Self::MetadataProfiles => matches!(app, StarrApp::Lidarr | StarrApp::Readarr),
            Self::DownloadClients => true,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QualityProfiles => write!(f, "quality profiles"),
            Self::MetadataProfiles => write!(f, "metadata profiles"),
            Self::DownloadClients => write!(f, "download clients"),
        }
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "quality-profiles" | "qualityprofiles" | "quality" => Ok(Self::QualityProfiles),
            "metadata-profiles" | "metadataprofiles" | "metadata" => Ok(Self::MetadataProfiles),
            "download-clients" | "downloadclients" | "downloaders" | "clients" => {
                Ok(Self::DownloadClients)
            }
            other => Err(format!("Unknown resource: {other}")),
        }
    }
}

/// API version segment the app serves.
pub fn api_version(app: StarrApp) -> &'static str {
    match app {
        StarrApp::Radarr | StarrApp::Sonarr | StarrApp::Whisparr => "v3",
        StarrApp::Lidarr | StarrApp::Prowlarr | StarrApp::Readarr => "v1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_matrix() {
        assert!(!Resource::QualityProfiles.supported_by(StarrApp::Prowlarr));
        assert!(Resource::QualityProfiles.supported_by(StarrApp::Whisparr));
        assert!(Resource::MetadataProfiles.supported_by(StarrApp::Lidarr));
        assert!(Resource::MetadataProfiles.supported_by(StarrApp::Readarr));
        assert!(!Resource::MetadataProfiles.supported_by(StarrApp::Sonarr));
        for app in StarrApp::ALL {
            assert!(Resource::DownloadClients.supported_by(app));
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("quality-profiles".parse(), Ok(Resource::QualityProfiles));
        assert_eq!("Metadata_Profiles".parse(), Ok(Resource::MetadataProfiles));
        assert_eq!("downloaders".parse(), Ok(Resource::DownloadClients));
        assert!("indexers".parse::<Resource>().is_err());
    }

    #[test]
    fn test_api_versions() {
        assert_eq!(api_version(StarrApp::Sonarr), "v3");
        assert_eq!(api_version(StarrApp::Radarr), "v3");
        assert_eq!(api_version(StarrApp::Lidarr), "v1");
        assert_eq!(api_version(StarrApp::Prowlarr), "v1");
    }
}
