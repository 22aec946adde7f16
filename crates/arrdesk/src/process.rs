//! Process lifecycle: version query and quit.
//!
//! Quit runs under the same lock the update pipeline holds while spawning an
//! installer, so the process is never torn down halfway through a handoff.
//! Teardown (final store flushes) runs while the lock is held, then the
//! [`ExitHandler`] ends the process.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::error::AppError;

/// Build metadata and uptime of the running process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppVersion {
    pub version: String,
    pub revision: String,
    pub branch: String,
    pub build_user: String,
    pub build_date: String,
    pub rustc: String,
    /// Process start time, RFC 3339 to the second
    pub started: String,
    pub running_secs: u64,
}

/// Ends the process. Replaced in tests and embedders.
pub trait ExitHandler: Send + Sync {
    fn exit(&self, code: i32);
}

/// Calls [`std::process::exit`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl ExitHandler for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

pub struct ProcessControl {
    started: DateTime<Utc>,
    started_at: Instant,
    handoff: Arc<Mutex<()>>,
    exit: Arc<dyn ExitHandler>,
}

impl ProcessControl {
    /// `handoff` must be the lock the installer launch takes.
    pub fn new(handoff: Arc<Mutex<()>>, exit: Arc<dyn ExitHandler>) -> Self {
        Self {
            started: Utc::now(),
            started_at: Instant::now(),
            handoff,
            exit,
        }
    }

    pub fn version(&self) -> AppVersion {
        AppVersion {
            version: env!("CARGO_PKG_VERSION").to_string(),
            revision: option_env!("ARRDESK_REVISION").unwrap_or("unknown").to_string(),
            branch: option_env!("ARRDESK_BRANCH").unwrap_or("unknown").to_string(),
            build_user: option_env!("ARRDESK_BUILD_USER").unwrap_or("unknown").to_string(),
            build_date: option_env!("ARRDESK_BUILD_DATE").unwrap_or("unknown").to_string(),
            rustc: option_env!("ARRDESK_RUSTC_VERSION").unwrap_or("unknown").to_string(),
            started: self.started.to_rfc3339_opts(SecondsFormat::Secs, true),
            running_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Run `teardown` under the handoff lock, then exit.
    ///
    /// The exit code is 0 unless teardown failed. Returns the code handed to
    /// the exit handler, which only matters when the handler does not exit.
    pub async fn quit<F>(&self, teardown: F) -> i32
    where
        F: Future<Output = Result<(), AppError>>,
    {
        let _handoff = self.handoff.lock().await;
        info!("Quitting");

        let code = match teardown.await {
            Ok(()) => 0,
            Err(e) => {
                error!(error = %e, "Teardown failed");
                1
            }
        };

        self.exit.exit(code);
        code
    }
}
