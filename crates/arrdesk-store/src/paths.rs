//! On-disk locations for persisted state.
//!
//! Platform defaults:
//! - Unix: `~/.config/arrdesk/` for documents, `~/.cache/arrdesk/staging` for downloads
//! - Windows: `%APPDATA%\arrdesk\arrdesk\config\`, `%LOCALAPPDATA%\arrdesk\arrdesk\cache\staging`
//! - macOS: `~/Library/Application Support/io.arrdesk.arrdesk/`, `~/Library/Caches/io.arrdesk.arrdesk/staging`

use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "settings.toml";
const INSTANCES_FILE: &str = "instances.json";
const UPDATER_FILE: &str = "updater.toml";
const STAGING_DIR: &str = "staging";

/// Resolved file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub settings_file: PathBuf,
    pub instances_file: PathBuf,
    pub updater_file: PathBuf,
    /// Default directory for staged update downloads
    pub staging_dir: PathBuf,
}

impl AppPaths {
    /// Platform-specific locations, if a home directory can be determined.
    pub fn discover() -> Option<Self> {
        let dirs = directories::ProjectDirs::from("io", "arrdesk", "arrdesk")?;
        let config_dir = dirs.config_dir().to_path_buf();
        Some(Self {
            settings_file: config_dir.join(SETTINGS_FILE),
            instances_file: config_dir.join(INSTANCES_FILE),
            updater_file: config_dir.join(UPDATER_FILE),
            staging_dir: dirs.cache_dir().join(STAGING_DIR),
            config_dir,
        })
    }

    /// Keep everything under a single directory.
    pub fn from_root(root: &Path) -> Self {
        Self {
            config_dir: root.to_path_buf(),
            settings_file: root.join(SETTINGS_FILE),
            instances_file: root.join(INSTANCES_FILE),
            updater_file: root.join(UPDATER_FILE),
            staging_dir: root.join(STAGING_DIR),
        }
    }

    /// Staging directory for a `download_dir` setting. Empty means the default.
    pub fn staging_for(&self, download_dir: &str) -> PathBuf {
        let trimmed = download_dir.trim();
        if trimmed.is_empty() {
            self.staging_dir.clone()
        } else {
            PathBuf::from(trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_root_layout() {
        let paths = AppPaths::from_root(Path::new("/tmp/arr"));
        assert_eq!(paths.settings_file, Path::new("/tmp/arr/settings.toml"));
        assert_eq!(paths.instances_file, Path::new("/tmp/arr/instances.json"));
        assert_eq!(paths.staging_dir, Path::new("/tmp/arr/staging"));
    }

    #[test]
    fn test_staging_for() {
        let paths = AppPaths::from_root(Path::new("/tmp/arr"));
        assert_eq!(paths.staging_for(""), paths.staging_dir);
        assert_eq!(paths.staging_for("  "), paths.staging_dir);
        assert_eq!(paths.staging_for("/downloads"), Path::new("/downloads"));
    }
}
