//! Tracing setup with a reloadable level filter.
//!
//! The subscriber is `registry()` + a reloadable [`EnvFilter`] + `fmt::layer()`.
//! Saving `log_level` with `apply_now` swaps the filter in place through a
//! [`LogHandle`]; nothing else about the subscriber changes.
//!
//! Precedence at startup: `--debug` / `--verbose`, then `RUST_LOG`, then the
//! stored `log_level`. A level chosen by the first two is pinned and the
//! stored level is not applied over it on startup. Live changes always apply.

use std::sync::{Arc, Mutex};

use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use crate::error::AppError;

/// Handle for changing the log level of a running subscriber.
#[derive(Clone)]
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
    level: Arc<Mutex<String>>,
    pinned: bool,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandle")
            .field("level", &self.level())
            .field("pinned", &self.pinned)
            .finish()
    }
}

/// Parse a level directive such as `info` or `arrdesk=debug,warn`.
pub fn filter_for(directive: &str) -> Result<EnvFilter, AppError> {
    EnvFilter::try_new(directive)
        .map_err(|e| AppError::InvalidInput(format!("log level '{directive}': {e}")))
}

impl LogHandle {
    /// Build the reloadable filter layer and its handle.
    ///
    /// The layer must be installed on a [`Registry`] for the handle to work.
    pub fn layer(
        directive: &str,
        pinned: bool,
    ) -> Result<(reload::Layer<EnvFilter, Registry>, LogHandle), AppError> {
        let (layer, handle) = reload::Layer::new(filter_for(directive)?);
        let handle = LogHandle {
            handle,
            level: Arc::new(Mutex::new(directive.to_string())),
            pinned,
        };
        Ok((layer, handle))
    }

    /// Level in effect.
    pub fn level(&self) -> String {
        self.level
            .lock()
            .map(|level| level.clone())
            .unwrap_or_default()
    }

    /// Whether the startup level came from the command line or `RUST_LOG`.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Replace the filter of the running subscriber.
    pub fn set_level(&self, directive: &str) -> Result<(), AppError> {
        let filter = filter_for(directive)?;
        self.handle
            .reload(filter)
            .map_err(|e| AppError::InvalidInput(format!("reloading log filter: {e}")))?;
        if let Ok(mut level) = self.level.lock() {
            *level = directive.to_string();
        }
        tracing::info!(level = directive, "Log level changed");
        Ok(())
    }
}

/// Startup directive: a command-line override, then `RUST_LOG`, then `fallback`.
///
/// Returns the directive and whether it is pinned.
pub fn startup_directive(cli_override: Option<&str>, fallback: &str) -> (String, bool) {
    if let Some(level) = cli_override {
        return (level.to_string(), true);
    }
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => (env, true),
        _ => (fallback.to_string(), false),
    }
}

/// Install the global subscriber and return its level handle.
pub fn init(directive: &str, pinned: bool) -> Result<LogHandle, AppError> {
    let (filter, handle) = LogHandle::layer(directive, pinned)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| AppError::InvalidInput(format!("installing log subscriber: {e}")))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_changes_level() {
        let (layer, handle) = LogHandle::layer("info", false).unwrap();
        let subscriber = Registry::default().with(layer);

        handle.set_level("debug").unwrap();
        assert_eq!(handle.level(), "debug");
        drop(subscriber);
    }

    #[test]
    fn test_reload_without_subscriber_fails() {
        let (layer, handle) = LogHandle::layer("info", false).unwrap();
        drop(layer);
        assert!(handle.set_level("debug").is_err());
        assert_eq!(handle.level(), "info");
    }

    #[test]
    fn test_invalid_directive_is_rejected() {
        let (_layer, handle) = LogHandle::layer("info", false).unwrap();
        assert!(handle.set_level("not a [level").is_err());
        assert_eq!(handle.level(), "info");
    }

    #[test]
    fn test_cli_override_is_pinned() {
        let (directive, pinned) = startup_directive(Some("debug"), "warn");
        assert_eq!(directive, "debug");
        assert!(pinned);
    }
}
