//! Property-based tests for arrdesk-store.
//!
//! # Properties Tested
//!
//! - Property 1: Instance ids stay unique and keep insertion order
//! - Property 2: Save and remove change the collection size by exactly 0 or ±1
//! - Property 3: Rejected removals leave the collection untouched
//! - Property 4: Field-scoped saves only change the named field

use std::collections::HashSet;

use proptest::prelude::*;
use tempfile::TempDir;

use crate::config_store::ConfigStore;
use crate::error::StoreError;
use crate::instance::{AppConfig, StarrApp};
use crate::instance_store::InstanceStore;
use crate::settings::Settings;
use crate::value::ConfigValue;

// =============================================================================
// Generators
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Save { id: i64, name: String },
    Remove { id: i64, name: String },
}

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..8, arb_name()).prop_map(|(id, name)| Op::Save { id, name }),
        (0i64..8, arb_name()).prop_map(|(id, name)| Op::Remove { id, name }),
    ]
}

fn arb_app() -> impl Strategy<Value = StarrApp> {
    prop::sample::select(StarrApp::ALL.to_vec())
}

/// A settings write as (key, value).
fn arb_setting() -> impl Strategy<Value = (&'static str, ConfigValue)> {
    prop_oneof![
        any::<bool>().prop_map(|b| ("dark", ConfigValue::Bool(b))),
        any::<bool>().prop_map(|b| ("dev_mode", ConfigValue::Bool(b))),
        prop::sample::select(vec!["error", "warn", "info", "debug", "trace"])
            .prop_map(|l| ("log_level", ConfigValue::from(l))),
        (1i64..=600).prop_map(|n| ("request_timeout_secs", ConfigValue::from(n))),
        "[a-z/]{0,12}".prop_map(|s| ("download_dir", ConfigValue::from(s))),
    ]
}

// =============================================================================
// Helper Functions
// =============================================================================

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn config(app: StarrApp, name: &str) -> AppConfig {
    AppConfig::new(app, name, format!("http://localhost:{}", app.default_port()))
}

// =============================================================================
// Property 1 + 2: Instance collection invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any sequence of saves and removes, ids stay unique, first-insert
    /// order is preserved, and each operation changes the size by the
    /// expected amount.
    #[test]
    fn prop_instance_ops_keep_invariants(
        ops in prop::collection::vec(arb_op(), 1..40),
        app in arb_app(),
    ) {
        let dir = TempDir::new().unwrap();
        let store = InstanceStore::new(dir.path().join("instances.json"));
        let rt = runtime();

        // Reference model: ordered (id, name) pairs.
        let mut model: Vec<(i64, String)> = Vec::new();

        for op in ops {
            let before = rt.block_on(store.list()).unwrap().len();
            match op {
                Op::Save { id, name } => {
                    rt.block_on(store.save_instance(id, config(app, &name), false)).unwrap();
                    let existed = match model.iter_mut().find(|(i, _)| *i == id) {
                        Some(entry) => {
                            entry.1 = name;
                            true
                        }
                        None => {
                            model.push((id, name));
                            false
                        }
                    };
                    let after = rt.block_on(store.list()).unwrap().len();
                    prop_assert_eq!(after, if existed { before } else { before + 1 });
                }
                Op::Remove { id, name } => {
                    let result = rt.block_on(store.remove_instance(id, &name));
                    let position = model.iter().position(|(i, n)| *i == id && *n == name);
                    match position {
                        Some(pos) => {
                            prop_assert!(result.is_ok());
                            model.remove(pos);
                        }
                        None => prop_assert!(result.is_err()),
                    }
                    let after = rt.block_on(store.list()).unwrap().len();
                    prop_assert_eq!(after, if position.is_some() { before - 1 } else { before });
                }
            }

            let list = rt.block_on(store.list()).unwrap();
            let unique: HashSet<i64> = list.iter().map(|i| i.id).collect();
            prop_assert_eq!(unique.len(), list.len());

            let actual: Vec<(i64, String)> =
                list.into_iter().map(|i| (i.id, i.config.name)).collect();
            prop_assert_eq!(&actual, &model);
        }

        // Reloading from disk yields the same collection.
        let reopened = InstanceStore::new(dir.path().join("instances.json"));
        let on_disk: Vec<(i64, String)> = rt
            .block_on(reopened.list())
            .unwrap()
            .into_iter()
            .map(|i| (i.id, i.config.name))
            .collect();
        prop_assert_eq!(on_disk, model);
    }
}

// =============================================================================
// Property 3: Rejected removals change nothing
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Removing with the wrong label fails with `NameMismatch` and leaves
    /// the file byte-for-byte unchanged.
    #[test]
    fn prop_name_mismatch_is_noop(
        names in prop::collection::vec(arb_name(), 1..6),
        wrong in "[A-Z]{1,8}",
    ) {
        let dir = TempDir::new().unwrap();
        let store = InstanceStore::new(dir.path().join("instances.json"));
        let rt = runtime();

        for (id, name) in names.iter().enumerate() {
            rt.block_on(store.save_instance(id as i64, config(StarrApp::Sonarr, name), false))
                .unwrap();
        }
        let before = std::fs::read(store.path()).unwrap();

        let err = rt.block_on(store.remove_instance(0, &wrong)).unwrap_err();
        let is_mismatch = matches!(err, StoreError::NameMismatch { .. });
        prop_assert!(is_mismatch);
        prop_assert_eq!(std::fs::read(store.path()).unwrap(), before);
        prop_assert_eq!(rt.block_on(store.list()).unwrap().len(), names.len());
    }
}

// =============================================================================
// Property 4: Field-scoped settings writes
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of settings writes, the stored document equals the
    /// defaults with each write applied in order, both in memory and on disk.
    #[test]
    fn prop_settings_writes_are_field_scoped(
        writes in prop::collection::vec(arb_setting(), 1..12),
    ) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("settings.toml"));
        let rt = runtime();

        let mut expected = Settings::default();
        for (key, value) in writes {
            expected = expected.with_option(key, &value).unwrap();
            rt.block_on(store.save_config_item(key, value, false)).unwrap();
        }

        prop_assert_eq!(&rt.block_on(store.get_config()).unwrap(), &expected);

        let reopened = ConfigStore::new(dir.path().join("settings.toml"));
        prop_assert_eq!(rt.block_on(reopened.get_config()).unwrap(), expected);
    }
}
