//! Release feed parsing.
//!
//! Feeds use the GitHub "latest release" JSON shape:
//!
//! ```json
//! {
//!   "tag_name": "v0.4.0",
//!   "name": "arrdesk 0.4.0",
//!   "body": "release notes (markdown)",
//!   "html_url": "https://github.com/arrdesk/arrdesk/releases/tag/v0.4.0",
//!   "published_at": "2024-05-01T12:00:00Z",
//!   "assets": [
//!     {
//!       "name": "arrdesk-0.4.0-linux-x86_64.AppImage",
//!       "browser_download_url": "https://...",
//!       "size": 1048576,
//!       "digest": "sha256:9f86d081..."
//!     }
//!   ]
//! }
//! ```
//!
//! A feed entry becomes a [`Release`] relative to the running version: either
//! an update with the artifact for this platform, or the "up to date"
//! sentinel.

use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::artifact;
use crate::error::UpdateError;

/// Latest release as published by a feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<FeedAsset>,
}

/// Downloadable file attached to a feed release.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
    /// `"sha256:<hex>"` when the host computed one
    #[serde(default)]
    pub digest: Option<String>,
}

/// Result of an update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Latest version, or the running version when up to date
    pub version: Version,
    pub name: String,
    /// Release notes (markdown)
    pub notes: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Human-facing release page
    pub page_url: String,
    /// Artifact for this platform; always `None` on the sentinel
    pub asset: Option<ReleaseAsset>,
    pub update_available: bool,
}

/// The artifact to download for an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
    /// Expected size in bytes, if the feed reported one
    pub size: Option<u64>,
    /// Expected SHA-256 as lowercase hex, if the feed reported one
    pub sha256: Option<String>,
}

impl Release {
    /// The "no update" sentinel for the running version.
    pub fn up_to_date(current: &Version) -> Self {
        Self {
            version: current.clone(),
            name: String::new(),
            notes: String::new(),
            published_at: None,
            page_url: String::new(),
            asset: None,
            update_available: false,
        }
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.update_available {
            write!(f, "update available: {}", self.version)
        } else {
            write!(f, "up to date ({})", self.version)
        }
    }
}

/// Operating system and architecture of the running binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl Platform {
    /// Substrings that identify this OS in an asset name.
    fn os_aliases(&self) -> &'static [&'static str] {
        match self.os {
            "windows" => &["windows", "win64", "win32"],
            "macos" => &["macos", "darwin", "osx", "mac"],
            "linux" => &["linux"],
            _ => &[],
        }
    }

    /// Substrings that identify this architecture in an asset name.
    fn arch_aliases(&self) -> &'static [&'static str] {
        match self.arch {
            "x86_64" => &["x86_64", "amd64", "x64"],
            "aarch64" => &["aarch64", "arm64"],
            "x86" => &["i386", "i686", "x86"],
            "arm" => &["armv7", "armhf", "arm"],
            _ => &[],
        }
    }

    /// Installer extensions this platform can launch, most preferred first.
    /// Archives and distro packages are never picked.
    pub fn installer_extensions(&self) -> &'static [&'static str] {
        match self.os {
            "windows" => &[".exe", ".msi"],
            "macos" => &[".dmg", ".pkg"],
            "linux" => &[".appimage", ".run"],
            _ => &[],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Get the platform this binary was built for.
pub fn current_platform() -> Platform {
    let os = if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86") {
        "x86"
    } else if cfg!(target_arch = "arm") {
        "arm"
    } else {
        "unknown"
    };

    Platform { os, arch }
}

/// Parse a release tag into a version. A leading `v` is ignored.
pub fn parse_version(tag: &str) -> Result<Version, UpdateError> {
    let trimmed = tag.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| UpdateError::Parse(format!("invalid version '{tag}': {e}")))
}

/// Files that accompany an installer but are not one.
fn is_auxiliary(name: &str) -> bool {
    const AUX: &[&str] = &[".sha256", ".sha512", ".sig", ".asc", ".txt", ".json", ".md5"];
    AUX.iter().any(|ext| name.ends_with(ext))
}

/// Pick the asset for `platform`, or `None` if nothing fits.
///
/// Assets naming both the OS and the architecture win over OS-only matches
/// (universal builds). Within a tier, the preferred installer extension wins.
pub fn select_asset<'a>(assets: &'a [FeedAsset], platform: &Platform) -> Option<&'a FeedAsset> {
    let os_aliases = platform.os_aliases();
    let arch_aliases = platform.arch_aliases();
    let extensions = platform.installer_extensions();

    let mut best: Option<(u8, usize, &FeedAsset)> = None;
    for asset in assets {
        let name = asset.name.to_ascii_lowercase();
        if is_auxiliary(&name) || !os_aliases.iter().any(|a| name.contains(a)) {
            continue;
        }
        let Some(ext_rank) = extensions.iter().position(|ext| name.ends_with(ext)) else {
            continue;
        };
        let tier = if arch_aliases.iter().any(|a| name.contains(a)) { 0 } else { 1 };

        let better = match best {
            None => true,
            Some((best_tier, best_rank, _)) => (tier, ext_rank) < (best_tier, best_rank),
        };
        if better {
            best = Some((tier, ext_rank, asset));
        }
    }
    best.map(|(_, _, asset)| asset)
}

/// Normalize a feed digest to lowercase SHA-256 hex.
///
/// Accepts `sha256:<hex>` or bare hex. Digests in other algorithms are
/// ignored; malformed SHA-256 values are an error.
pub fn parse_digest(digest: &str) -> Result<Option<String>, UpdateError> {
    let digest = digest.trim();
    let hex_part = match digest.split_once(':') {
        Some((algo, value)) if algo.eq_ignore_ascii_case("sha256") => value,
        Some(_) => return Ok(None),
        None => digest,
    };
    artifact::parse_sha256(hex_part)?;
    Ok(Some(hex_part.to_ascii_lowercase()))
}

impl FeedRelease {
    /// Turn a feed entry into a [`Release`] relative to `current`.
    ///
    /// # Errors
    ///
    /// - `Parse` if the tag is not a version or a digest is malformed
    /// - `NoAsset` if the release is newer but has nothing for `platform`
    pub fn into_release(self, current: &Version, platform: &Platform) -> Result<Release, UpdateError> {
        let version = parse_version(&self.tag_name)?;
        if version <= *current {
            return Ok(Release::up_to_date(current));
        }

        let asset = select_asset(&self.assets, platform)
            .ok_or_else(|| UpdateError::NoAsset(platform.to_string()))?;
        let sha256 = match asset.digest.as_deref() {
            Some(digest) => parse_digest(digest)?,
            None => None,
        };
        let asset = ReleaseAsset {
            name: asset.name.clone(),
            download_url: asset.browser_download_url.clone(),
            size: (asset.size > 0).then_some(asset.size),
            sha256,
        };

        Ok(Release {
            name: self.name.unwrap_or_else(|| self.tag_name.clone()),
            notes: self.body.unwrap_or_default(),
            published_at: self.published_at,
            page_url: self.html_url.unwrap_or_default(),
            asset: Some(asset),
            update_available: true,
            version,
        })
    }
}
