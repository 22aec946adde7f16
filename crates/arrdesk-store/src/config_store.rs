//! Global settings store.
//!
//! Holds the single live [`Settings`] document. Reads take a shared lock;
//! field-scoped saves take the write lock for the whole
//! validate → flush → swap sequence, so there is at most one writer and the
//! in-memory copy always matches the last successful flush.
//!
//! Two views of the document exist:
//! - the **stored** document, returned by [`ConfigStore::get_config`], which
//!   includes every saved change;
//! - the **live** snapshot, published on a `watch` channel, which only picks
//!   up changes saved with `apply_now = true`. Subsystems that read the live
//!   snapshot keep the old value of a staged change until the next start.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::atomic;
use crate::error::StoreError;
use crate::settings::Settings;
use crate::value::ConfigValue;

const STORE_NAME: &str = "settings";

/// Result of a field-scoped settings write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSaved {
    /// Option that changed
    pub key: String,
    /// Value that was written
    pub value: ConfigValue,
    /// Whether the change reached live subsystems now
    pub applied: bool,
    /// Human-readable confirmation
    pub message: String,
}

/// Persistent store for the global settings document.
pub struct ConfigStore {
    path: PathBuf,
    document: RwLock<Option<Settings>>,
    live: watch::Sender<Settings>,
}

impl ConfigStore {
    /// Create a store backed by `path`. Nothing is read until first access.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            document: RwLock::new(None),
            live: watch::Sender::new(Settings::default()),
        }
    }

    /// Path of the backing TOML file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document now instead of on first access.
    pub async fn load(&self) -> Result<Settings, StoreError> {
        let mut doc = self.document.write().await;
        Ok(self.ensure_loaded(&mut doc)?.clone())
    }

    /// Return the current document, loading it on first access.
    ///
    /// # Errors
    ///
    /// `StorageUnavailable` if the file cannot be read or parsed and no
    /// document has been loaded yet. The next call retries the load.
    pub async fn get_config(&self) -> Result<Settings, StoreError> {
        if let Some(settings) = self.document.read().await.as_ref() {
            return Ok(settings.clone());
        }
        self.load().await
    }

    /// Write a single option and flush the whole document.
    ///
    /// The file is replaced atomically before the in-memory document changes.
    /// If the flush fails, neither the file nor the in-memory copy changes.
    /// With `apply_now`, the live snapshot picks up the new value as well.
    pub async fn save_config_item(
        &self,
        key: &str,
        value: ConfigValue,
        apply_now: bool,
    ) -> Result<ConfigSaved, StoreError> {
        let mut doc = self.document.write().await;
        let current = self.ensure_loaded(&mut doc)?;

        let updated = current.with_option(key, &value)?;
        let live_updated = if apply_now {
            Some(self.live.borrow().with_option(key, &value)?)
        } else {
            None
        };

        self.write_document(&updated)?;
        *doc = Some(updated);

        if let Some(live) = live_updated {
            self.live.send_replace(live);
        }

        info!(key, value = %value, applied = apply_now, "Config item saved");
        Ok(ConfigSaved {
            key: key.to_string(),
            message: format!("Config item '{key}' saved! Value: {value}"),
            value,
            applied: apply_now,
        })
    }

    /// Rewrite the loaded document to disk. No-op if nothing is loaded.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let doc = self.document.read().await;
        if let Some(settings) = doc.as_ref() {
            self.write_document(settings)?;
            debug!(path = %self.path.display(), "Settings flushed");
        }
        Ok(())
    }

    /// Current live snapshot.
    pub fn live(&self) -> Settings {
        self.live.borrow().clone()
    }

    /// Subscribe to live snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.live.subscribe()
    }

    fn ensure_loaded<'a>(
        &self,
        doc: &'a mut Option<Settings>,
    ) -> Result<&'a Settings, StoreError> {
        if doc.is_none() {
            let loaded = self.read_document()?;
            self.live.send_replace(loaded.clone());
            *doc = Some(loaded);
        }
        doc.as_ref()
            .ok_or_else(|| StoreError::unavailable(STORE_NAME, "document not loaded"))
    }

    fn read_document(&self) -> Result<Settings, StoreError> {
        let swept = atomic::sweep_stale_temps(&self.path);
        if swept > 0 {
            warn!(count = swept, "Removed interrupted settings writes");
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No settings file, using defaults");
                return Ok(Settings::default());
            }
            Err(e) => return Err(StoreError::unavailable(STORE_NAME, e)),
        };

        let settings = Settings::from_toml(&content)
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        debug!(path = %self.path.display(), "Loaded settings");
        Ok(settings)
    }

    fn write_document(&self, settings: &Settings) -> Result<(), StoreError> {
        let content = settings.to_toml()?;
        atomic::write_atomic(&self.path, content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_store() -> (ConfigStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("settings.toml"));
        (store, dir)
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let (store, _dir) = create_store();
        assert_eq!(store.get_config().await.unwrap(), Settings::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_save_persists_and_reloads() {
        let (store, dir) = create_store();
        let saved = store
            .save_config_item("dark", ConfigValue::Bool(true), false)
            .await
            .unwrap();
        assert_eq!(saved.key, "dark");
        assert!(!saved.applied);
        assert!(saved.message.contains("dark"));

        let reopened = ConfigStore::new(dir.path().join("settings.toml"));
        assert!(reopened.get_config().await.unwrap().dark);
    }

    #[tokio::test]
    async fn test_unknown_key_leaves_file_unchanged() {
        let (store, _dir) = create_store();
        store
            .save_config_item("lang", ConfigValue::from("de"), true)
            .await
            .unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let err = store
            .save_config_item("theme", ConfigValue::from("dark"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownOption(_)));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_invalid_value_rejected() {
        let (store, _dir) = create_store();
        let err = store
            .save_config_item("log_level", ConfigValue::Number(3.0), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_apply_now_controls_live_snapshot() {
        let (store, _dir) = create_store();
        let mut rx = store.subscribe();

        store
            .save_config_item("log_level", ConfigValue::from("debug"), false)
            .await
            .unwrap();
        assert_eq!(store.get_config().await.unwrap().log_level, "debug");
        assert_eq!(store.live().log_level, "info");

        store
            .save_config_item("dark", ConfigValue::Bool(true), true)
            .await
            .unwrap();
        let live = rx.borrow_and_update().clone();
        assert!(live.dark);
        // The staged change is still not live.
        assert_eq!(live.log_level, "info");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unavailable_then_recovers() {
        let (store, _dir) = create_store();
        std::fs::write(store.path(), "dark = [[[").unwrap();

        let err = store.get_config().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable { .. }));

        std::fs::write(store.path(), "dark = true\n").unwrap();
        assert!(store.get_config().await.unwrap().dark);
    }

    #[tokio::test]
    async fn test_failed_flush_rolls_back() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("cfg");
        let store = ConfigStore::new(sub.join("settings.toml"));
        store
            .save_config_item("dark", ConfigValue::Bool(true), true)
            .await
            .unwrap();

        // Replace the directory with a file so the next write cannot land.
        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, b"").unwrap();

        let err = store
            .save_config_item("dark", ConfigValue::Bool(false), true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Disk(_)));
        assert!(store.get_config().await.unwrap().dark);
        assert!(store.live().dark);
    }

    #[tokio::test]
    async fn test_stale_temp_swept_on_load() {
        let (store, dir) = create_store();
        let stale = dir.path().join(".settings.toml.x1y2z3.tmp");
        std::fs::write(&stale, "half").unwrap();

        store.get_config().await.unwrap();
        assert!(!stale.exists());
    }
}
