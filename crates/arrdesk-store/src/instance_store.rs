//! Instance profile store.
//!
//! An ordered collection of [`SavedInstance`] records keyed by integer id,
//! persisted as a single JSON document.
//!
//! # Invariants
//!
//! - No two records share an id.
//! - Iteration order is insertion order; saving an existing id replaces the
//!   record in place.
//! - Every successful save or remove is on disk before the call returns. A
//!   failed flush leaves the in-memory collection untouched.
//!
//! Saves and removes hold the write lock across the flush, so concurrent
//! writers are serialized and no update is lost.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::atomic;
use crate::error::StoreError;
use crate::instance::AppConfig;

const STORE_NAME: &str = "instances";

/// Current on-disk document version.
const FILE_VERSION: u32 = 1;

/// Capacity of the reload broadcast channel.
const RELOAD_CHANNEL_CAPACITY: usize = 16;

/// A named configuration slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedInstance {
    pub id: i64,
    pub config: AppConfig,
}

/// Rules for mutating the active instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstancePolicy {
    /// Whether the active instance may be removed.
    pub allow_remove_active: bool,
}

#[derive(Debug, Default)]
struct Selection {
    active: Option<i64>,
    policy: InstancePolicy,
}

#[derive(Debug, Serialize, Deserialize)]
struct InstancesFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    instances: Vec<SavedInstance>,
}

/// Persistent store for instance profiles.
pub struct InstanceStore {
    path: PathBuf,
    instances: RwLock<Option<Vec<SavedInstance>>>,
    selection: RwLock<Selection>,
    reloads: broadcast::Sender<SavedInstance>,
}

impl InstanceStore {
    /// Create a store backed by `path`. Nothing is read until first access.
    pub fn new(path: PathBuf) -> Self {
        let (reloads, _) = broadcast::channel(RELOAD_CHANNEL_CAPACITY);
        Self {
            path,
            instances: RwLock::new(None),
            selection: RwLock::new(Selection::default()),
            reloads,
        }
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the collection now instead of on first access.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let mut guard = self.instances.write().await;
        Ok(self.ensure_loaded(&mut guard)?.len())
    }

    /// All instances in iteration order.
    pub async fn list(&self) -> Result<Vec<SavedInstance>, StoreError> {
        if let Some(instances) = self.instances.read().await.as_ref() {
            return Ok(instances.clone());
        }
        let mut guard = self.instances.write().await;
        Ok(self.ensure_loaded(&mut guard)?.clone())
    }

    /// Look up a single instance.
    pub async fn get(&self, id: i64) -> Result<Option<SavedInstance>, StoreError> {
        Ok(self.list().await?.into_iter().find(|i| i.id == id))
    }

    /// Set which instance is in use. Reload signals only go to this id.
    pub async fn set_active(&self, id: Option<i64>) {
        self.selection.write().await.active = id;
        debug!(?id, "Active instance set");
    }

    /// Currently active instance id.
    pub async fn active(&self) -> Option<i64> {
        self.selection.read().await.active
    }

    pub async fn set_policy(&self, policy: InstancePolicy) {
        self.selection.write().await.policy = policy;
    }

    /// Receive the active instance's config whenever it is saved with
    /// `apply_now`.
    pub fn subscribe_reloads(&self) -> broadcast::Receiver<SavedInstance> {
        self.reloads.subscribe()
    }

    /// Create or update the instance with `id`.
    ///
    /// A new id is appended; an existing id keeps its position. With
    /// `apply_now`, subscribers are told to reload if `id` is the active
    /// instance.
    ///
    /// # Errors
    ///
    /// - `Validation` if `config` is rejected
    /// - `StorageUnavailable` if the collection cannot be loaded
    /// - `Disk` if the flush fails (nothing changes)
    pub async fn save_instance(
        &self,
        id: i64,
        config: AppConfig,
        apply_now: bool,
    ) -> Result<SavedInstance, StoreError> {
        config.validate()?;
        let record = SavedInstance { id, config };

        let mut guard = self.instances.write().await;
        let current = self.ensure_loaded(&mut guard)?;

        let mut updated = current.clone();
        let created = match updated.iter_mut().find(|i| i.id == id) {
            Some(existing) => {
                existing.config = record.config.clone();
                false
            }
            None => {
                updated.push(record.clone());
                true
            }
        };

        self.write_document(&updated)?;
        *guard = Some(updated);
        drop(guard);

        info!(id, name = %record.config.name, created, "Instance saved");

        if apply_now {
            if self.active().await == Some(id) {
                if self.reloads.send(record.clone()).is_err() {
                    debug!(id, "No reload subscribers");
                }
            } else {
                debug!(id, "Instance is not active, reload skipped");
            }
        }

        Ok(record)
    }

    /// Remove the instance with `id`, confirming its label is `name`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no instance has `id`
    /// - `NameMismatch` if its label is not `name`
    /// - `InUse` if it is active and the policy forbids removing it
    /// - `Disk` if the flush fails (nothing changes)
    pub async fn remove_instance(&self, id: i64, name: &str) -> Result<SavedInstance, StoreError> {
        let mut guard = self.instances.write().await;
        let current = self.ensure_loaded(&mut guard)?;

        let position = current
            .iter()
            .position(|i| i.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let label = &current[position].config.name;
        if label != name {
            return Err(StoreError::NameMismatch {
                id,
                given: name.to_string(),
                actual: label.clone(),
            });
        }

        let mut selection = self.selection.write().await;
        let was_active = selection.active == Some(id);
        if was_active && !selection.policy.allow_remove_active {
            return Err(StoreError::InUse(id));
        }

        let mut updated = current.clone();
        let removed = updated.remove(position);

        self.write_document(&updated)?;
        *guard = Some(updated);

        if was_active {
            selection.active = None;
            warn!(id, "Removed the active instance");
        }

        info!(id, name, "Instance removed");
        Ok(removed)
    }

    /// Rewrite the loaded collection to disk. No-op if nothing is loaded.
    pub async fn flush(&self) -> Result<(), StoreError> {
        let guard = self.instances.read().await;
        if let Some(instances) = guard.as_ref() {
            self.write_document(instances)?;
            debug!(count = instances.len(), "Instances flushed");
        }
        Ok(())
    }

    fn ensure_loaded<'a>(
        &self,
        guard: &'a mut Option<Vec<SavedInstance>>,
    ) -> Result<&'a Vec<SavedInstance>, StoreError> {
        if guard.is_none() {
            *guard = Some(self.read_document()?);
        }
        guard
            .as_ref()
            .ok_or_else(|| StoreError::unavailable(STORE_NAME, "collection not loaded"))
    }

    fn read_document(&self) -> Result<Vec<SavedInstance>, StoreError> {
        let swept = atomic::sweep_stale_temps(&self.path);
        if swept > 0 {
            warn!(count = swept, "Removed interrupted instance writes");
        }

        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No instances file, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::unavailable(STORE_NAME, e)),
        };

        let file: InstancesFile = serde_json::from_slice(&content)
            .map_err(|e| StoreError::unavailable(STORE_NAME, e))?;
        if file.version > FILE_VERSION {
            return Err(StoreError::unavailable(
                STORE_NAME,
                format!("unsupported file version {}", file.version),
            ));
        }

        let mut seen = HashSet::new();
        for instance in &file.instances {
            if !seen.insert(instance.id) {
                return Err(StoreError::unavailable(
                    STORE_NAME,
                    format!("duplicate instance id {}", instance.id),
                ));
            }
        }

        debug!(count = file.instances.len(), "Loaded instances");
        Ok(file.instances)
    }

    fn write_document(&self, instances: &[SavedInstance]) -> Result<(), StoreError> {
        let file = InstancesFile {
            version: FILE_VERSION,
            instances: instances.to_vec(),
        };
        let content = serde_json::to_vec_pretty(&file)?;
        atomic::write_atomic(&self.path, &content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::StarrApp;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_store() -> (InstanceStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = InstanceStore::new(dir.path().join("instances.json"));
        (store, dir)
    }

    fn config(name: &str) -> AppConfig {
        AppConfig::new(StarrApp::Radarr, name, "http://localhost:7878")
    }

    fn ids(instances: &[SavedInstance]) -> Vec<i64> {
        instances.iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn test_save_appends_new_ids() {
        let (store, _dir) = create_store();
        store.save_instance(3, config("a"), false).await.unwrap();
        store.save_instance(1, config("b"), false).await.unwrap();
        store.save_instance(2, config("c"), false).await.unwrap();

        assert_eq!(ids(&store.list().await.unwrap()), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_save_existing_id_updates_in_place() {
        let (store, _dir) = create_store();
        store.save_instance(1, config("a"), false).await.unwrap();
        store.save_instance(2, config("b"), false).await.unwrap();
        store.save_instance(1, config("a2"), false).await.unwrap();

        let list = store.list().await.unwrap();
        assert_eq!(ids(&list), vec![1, 2]);
        assert_eq!(list[0].config.name, "a2");
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_config() {
        let (store, _dir) = create_store();
        let mut bad = config("a");
        bad.url = "nope".to_string();

        let err = store.save_instance(1, bad, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_name_mismatch_scenario() {
        let (store, _dir) = create_store();
        store.save_instance(1, config("cfgA"), false).await.unwrap();
        store.save_instance(1, config("cfgB"), false).await.unwrap();

        let err = store.remove_instance(1, "X").await.unwrap_err();
        assert!(matches!(err, StoreError::NameMismatch { id: 1, .. }));

        let remaining = store.get(1).await.unwrap().unwrap();
        assert_eq!(remaining.config.name, "cfgB");
    }

    #[tokio::test]
    async fn test_remove_returns_record_and_persists() {
        let (store, dir) = create_store();
        store.save_instance(1, config("a"), false).await.unwrap();
        store.save_instance(2, config("b"), false).await.unwrap();

        let removed = store.remove_instance(1, "a").await.unwrap();
        assert_eq!(removed.id, 1);

        let reopened = InstanceStore::new(dir.path().join("instances.json"));
        assert_eq!(ids(&reopened.list().await.unwrap()), vec![2]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_not_found() {
        let (store, _dir) = create_store();
        let err = store.remove_instance(9, "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(9)));
    }

    #[tokio::test]
    async fn test_remove_active_respects_policy() {
        let (store, _dir) = create_store();
        store.save_instance(1, config("a"), false).await.unwrap();
        store.set_active(Some(1)).await;

        let err = store.remove_instance(1, "a").await.unwrap_err();
        assert!(matches!(err, StoreError::InUse(1)));
        assert!(store.get(1).await.unwrap().is_some());

        store
            .set_policy(InstancePolicy {
                allow_remove_active: true,
            })
            .await;
        store.remove_instance(1, "a").await.unwrap();
        assert_eq!(store.active().await, None);
    }

    #[tokio::test]
    async fn test_apply_now_signals_only_active_instance() {
        let (store, _dir) = create_store();
        let mut rx = store.subscribe_reloads();
        store.set_active(Some(2)).await;

        store.save_instance(1, config("a"), true).await.unwrap();
        store.save_instance(2, config("b"), false).await.unwrap();
        assert!(rx.try_recv().is_err());

        store.save_instance(2, config("b2"), true).await.unwrap();
        let reloaded = rx.try_recv().unwrap();
        assert_eq!(reloaded.id, 2);
        assert_eq!(reloaded.config.name, "b2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_lose_nothing() {
        let (store, dir) = create_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..32)
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .save_instance(id, config(&format!("inst-{id}")), false)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 32);
        let reopened = InstanceStore::new(dir.path().join("instances.json"));
        let mut on_disk = ids(&reopened.list().await.unwrap());
        on_disk.sort_unstable();
        assert_eq!(on_disk, (0..32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_duplicate_ids_on_disk_are_rejected() {
        let (store, _dir) = create_store();
        let record = SavedInstance {
            id: 1,
            config: config("a"),
        };
        let file = InstancesFile {
            version: FILE_VERSION,
            instances: vec![record.clone(), record],
        };
        std::fs::write(store.path(), serde_json::to_vec(&file).unwrap()).unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_failed_flush_rolls_back() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("data");
        let store = InstanceStore::new(sub.join("instances.json"));
        store.save_instance(1, config("a"), false).await.unwrap();

        std::fs::remove_dir_all(&sub).unwrap();
        std::fs::write(&sub, b"").unwrap();

        assert!(store.save_instance(2, config("b"), false).await.is_err());
        assert!(store.remove_instance(1, "a").await.is_err());
        assert_eq!(ids(&store.list().await.unwrap()), vec![1]);
    }
}
