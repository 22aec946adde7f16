//! Property-based tests for arrdesk.
//!
//! # Properties Tested
//!
//! - Property 1: Every failure maps to a non-zero exit code and a reply that
//!   carries the error's message
//! - Property 2: A chooser filter accepts exactly the listed extensions
//! - Property 3: Rejected settings writes leave the settings file untouched

use std::path::Path;
use std::sync::Arc;

use arrdesk_starr::{Resource, StarrError};
use arrdesk_store::{AppPaths, ConfigValue, StarrApp, StoreError};
use arrdesk_updater::UpdateError;
use proptest::prelude::*;
use tempfile::TempDir;

use crate::app::{App, Services};
use crate::error::AppError;
use crate::process::ExitHandler;
use crate::shell::{matches_filter, ScriptedDialogs, Shell};
use crate::ExitCode;

// =============================================================================
// Generators
// =============================================================================

fn arb_store_error() -> impl Strategy<Value = AppError> {
    prop_oneof![
        "[a-z_]{1,12}".prop_map(|k| AppError::Store(StoreError::UnknownOption(k))),
        "[a-z ]{1,20}".prop_map(|r| AppError::Store(StoreError::invalid("lang", r))),
        any::<i64>().prop_map(|id| AppError::Store(StoreError::NotFound(id))),
        any::<i64>().prop_map(|id| AppError::Store(StoreError::InUse(id))),
        ("[a-z]{1,8}", "[a-z]{1,8}").prop_map(|(given, actual)| {
            AppError::Store(StoreError::NameMismatch { id: 1, given, actual })
        }),
        "[a-z ]{1,20}".prop_map(|r| AppError::Store(StoreError::unavailable("instances", r))),
    ]
}

fn arb_update_error() -> impl Strategy<Value = AppError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(|r| AppError::Update(UpdateError::Network(r))),
        (100u16..600).prop_map(|status| AppError::Update(UpdateError::HttpStatus {
            url: "http://feed".into(),
            status,
        })),
        (1u64..600).prop_map(|secs| AppError::Update(UpdateError::Timeout {
            operation: "check",
            secs,
        })),
        "[a-z ]{1,20}".prop_map(|r| AppError::Update(UpdateError::Parse(r))),
        Just(()).prop_map(|_| AppError::Update(UpdateError::NoPendingUpdate)),
        "[a-z/]{1,20}".prop_map(|p| AppError::Update(UpdateError::NotExecutable(p))),
    ]
}

fn arb_starr_error() -> impl Strategy<Value = AppError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(|r| AppError::Starr(StarrError::Request(r))),
        (1u64..600).prop_map(|secs| AppError::Starr(StarrError::Timeout { secs })),
        (400u16..600, "[A-Za-z ]{1,20}").prop_map(|(status, message)| {
            AppError::Starr(StarrError::Status {
                app: StarrApp::Radarr,
                status,
                message,
            })
        }),
        Just(()).prop_map(|_| AppError::Starr(StarrError::Unsupported {
            app: StarrApp::Prowlarr,
            resource: Resource::QualityProfiles,
        })),
        "[a-z ]{1,20}".prop_map(|r| AppError::Starr(StarrError::Mismatch(r))),
    ]
}

fn arb_app_error() -> impl Strategy<Value = AppError> {
    prop_oneof![
        arb_store_error(),
        arb_update_error(),
        arb_starr_error(),
        "[a-z/]{1,20}".prop_map(AppError::PathNotFound),
        Just(()).prop_map(|_| AppError::Unsupported("creating a shortcut")),
    ]
}

fn arb_extension() -> impl Strategy<Value = String> {
    "[a-z]{2,4}"
}

// =============================================================================
// Helper Functions
// =============================================================================

struct NoShell;

impl Shell for NoShell {
    fn open_folder(&self, _path: &Path) -> Result<(), AppError> {
        Ok(())
    }

    fn create_shortcut(&self) -> Result<std::path::PathBuf, AppError> {
        Err(AppError::Unsupported("creating a shortcut"))
    }
}

struct NoExit;

impl ExitHandler for NoExit {
    fn exit(&self, _code: i32) {}
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn open(dir: &TempDir) -> App {
    let services = Services {
        dialogs: Arc::new(ScriptedDialogs::new()),
        shell: Arc::new(NoShell),
        exit: Arc::new(NoExit),
        logging: None,
    };
    App::open(AppPaths::from_root(dir.path()), services)
        .await
        .unwrap()
}

// =============================================================================
// Property 1: Error Replies
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Failures never exit with success and the reply matches the error.
    #[test]
    fn prop_error_reply_matches_error(err in arb_app_error()) {
        prop_assert_ne!(err.exit_code(), ExitCode::Success);

        let reply = err.reply();
        prop_assert_eq!(reply.kind, err.kind());
        prop_assert_eq!(&reply.message, &err.to_string());
        prop_assert_eq!(reply.retryable, err.is_retryable());
    }
}

// =============================================================================
// Property 2: Chooser Filters
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A file passes the filter iff its extension is listed.
    #[test]
    fn prop_filter_accepts_listed_extensions(
        listed in prop::collection::btree_set(arb_extension(), 1..4),
        ext in arb_extension(),
        upper in any::<bool>(),
    ) {
        let filter = listed
            .iter()
            .map(|e| format!("*.{e}"))
            .collect::<Vec<_>>()
            .join(";");
        let name = format!("installer.{ext}");
        let name = if upper { name.to_uppercase() } else { name };

        prop_assert_eq!(matches_filter(Path::new(&name), &filter), listed.contains(&ext));
    }
}

// =============================================================================
// Property 3: Rejected Settings Writes
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Unknown keys and mistyped values change nothing on disk.
    #[test]
    fn prop_rejected_write_leaves_file_unchanged(
        key in prop_oneof![
            "[a-z]{3,10}_x".prop_map(|k| (k, ConfigValue::Bool(true))),
            Just(("dark".to_string(), ConfigValue::String("maybe".into()))),
            Just(("request_timeout_secs".to_string(), ConfigValue::Number(0.0))),
            Just(("updates".to_string(), ConfigValue::String("nightly".into()))),
        ],
        apply_now in any::<bool>(),
    ) {
        let (key, value) = key;
        let dir = TempDir::new().unwrap();
        let rt = runtime();

        rt.block_on(async {
            let app = open(&dir).await;
            app.save_config_item("dark", ConfigValue::Bool(true), true).await.unwrap();
            let before = std::fs::read(dir.path().join("settings.toml")).unwrap();

            let result = app.save_config_item(&key, value, apply_now).await;
            prop_assert!(result.is_err());

            let after = std::fs::read(dir.path().join("settings.toml")).unwrap();
            prop_assert_eq!(before, after);
            prop_assert!(app.get_config().await.unwrap().dark);
            Ok(())
        })?;
    }
}
