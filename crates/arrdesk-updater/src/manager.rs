//! Update pipeline - orchestrates check, download and installer handoff.
//!
//! The stages run strictly in order and the caller may stop after any of
//! them:
//!
//! ```text
//! Idle -> Checking -> UpToDate | UpdateAvailable | CheckFailed
//! UpdateAvailable -> Downloading -> Staged | DownloadFailed
//! Staged -> Launched
//! ```
//!
//! A download always uses the release found by the last successful check.
//! Launching takes the shared handoff lock so a concurrent quit cannot tear
//! the process down in the middle of spawning the installer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactVerifier;
use crate::channel::ReleaseChannel;
use crate::checker::{HttpReleaseSource, UpdateChecker};
use crate::config::UpdateConfig;
use crate::download::{self, Downloader, ProgressCallback};
use crate::error::UpdateError;
use crate::launch::InstallerLauncher;
use crate::release::Release;

/// A staged, verified artifact ready for handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInfo {
    /// Where the artifact was staged
    pub path: PathBuf,
    /// The release it belongs to
    pub release: Release,
}

/// Current state of the update pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UpdateState {
    /// No check has run yet
    #[default]
    Idle,
    /// Checking the release feed
    Checking,
    /// The running version is the latest
    UpToDate,
    /// A newer release was found
    UpdateAvailable(Version),
    /// The last check failed
    CheckFailed(String),
    /// Downloading the artifact
    Downloading,
    /// Artifact downloaded and verified
    Staged(PathBuf),
    /// The last download failed
    DownloadFailed(String),
    /// Installer started with this process id
    Launched(String),
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Checking => write!(f, "checking"),
            Self::UpToDate => write!(f, "up to date"),
            Self::UpdateAvailable(version) => write!(f, "update available ({version})"),
            Self::CheckFailed(reason) => write!(f, "check failed: {reason}"),
            Self::Downloading => write!(f, "downloading"),
            Self::Staged(path) => write!(f, "staged at {}", path.display()),
            Self::DownloadFailed(reason) => write!(f, "download failed: {reason}"),
            Self::Launched(pid) => write!(f, "installer running (pid {pid})"),
        }
    }
}

/// Runtime knobs the user can change while the app is running.
#[derive(Debug, Clone)]
struct PipelineSettings {
    channel: ReleaseChannel,
    staging_dir: PathBuf,
    check_timeout: Duration,
}

/// Main update pipeline.
pub struct UpdatePipeline {
    config: UpdateConfig,
    checker: UpdateChecker,
    downloader: Downloader,
    launcher: InstallerLauncher,
    settings: RwLock<PipelineSettings>,
    state: RwLock<UpdateState>,
    /// Release found by the last successful check, if newer
    pending: RwLock<Option<Release>>,
    /// Artifact staged by the last successful download
    staged: RwLock<Option<UpdateInfo>>,
    last_check: RwLock<Option<DateTime<Utc>>>,
    /// Serializes downloads so two never write the same staged file
    download_lock: Mutex<()>,
    /// Shared with process control; held across installer spawn
    handoff: Arc<Mutex<()>>,
}

impl UpdatePipeline {
    /// Create a pipeline that reads the HTTP release feed.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid or no HTTP client can be built.
    pub fn new(
        config: UpdateConfig,
        current_version: Version,
        staging_dir: PathBuf,
    ) -> Result<Self, UpdateError> {
        let source = Arc::new(HttpReleaseSource::new(config.http_client()?));
        let checker = UpdateChecker::new(source, current_version);
        Self::with_checker(config, checker, staging_dir)
    }

    /// Create a pipeline with a custom checker.
    pub fn with_checker(
        config: UpdateConfig,
        checker: UpdateChecker,
        staging_dir: PathBuf,
    ) -> Result<Self, UpdateError> {
        config.validate()?;
        let downloader = Downloader::new(config.http_client()?);
        let settings = PipelineSettings {
            channel: ReleaseChannel::default(),
            staging_dir,
            check_timeout: config.check_timeout(),
        };

        Ok(Self {
            config,
            checker,
            downloader,
            launcher: InstallerLauncher::new(),
            settings: RwLock::new(settings),
            state: RwLock::new(UpdateState::Idle),
            pending: RwLock::new(None),
            staged: RwLock::new(None),
            last_check: RwLock::new(None),
            download_lock: Mutex::new(()),
            handoff: Arc::new(Mutex::new(())),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Get the running version.
    pub fn current_version(&self) -> &Version {
        self.checker.current_version()
    }

    /// Get the current state of the pipeline.
    pub async fn state(&self) -> UpdateState {
        self.state.read().await.clone()
    }

    /// Release remembered from the last check, if it found an update.
    pub async fn pending_release(&self) -> Option<Release> {
        self.pending.read().await.clone()
    }

    /// Artifact from the last successful download.
    pub async fn staged(&self) -> Option<UpdateInfo> {
        self.staged.read().await.clone()
    }

    /// When the feed last answered.
    pub async fn last_check(&self) -> Option<DateTime<Utc>> {
        *self.last_check.read().await
    }

    /// Lock shared with anything that must not overlap an installer spawn.
    pub fn handoff_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.handoff)
    }

    pub async fn channel(&self) -> ReleaseChannel {
        self.settings.read().await.channel
    }

    pub async fn set_channel(&self, channel: ReleaseChannel) {
        let mut settings = self.settings.write().await;
        if settings.channel != channel {
            info!(from = %settings.channel, to = %channel, "Release channel changed");
            settings.channel = channel;
        }
    }

    pub async fn staging_dir(&self) -> PathBuf {
        self.settings.read().await.staging_dir.clone()
    }

    pub async fn set_staging_dir(&self, dir: PathBuf) {
        debug!(dir = %dir.display(), "Staging directory changed");
        self.settings.write().await.staging_dir = dir;
    }

    pub async fn set_check_timeout(&self, timeout: Duration) {
        self.settings.write().await.check_timeout = timeout;
    }

    async fn set_state(&self, state: UpdateState) {
        *self.state.write().await = state;
    }

    /// Check the current channel for a newer release.
    ///
    /// Returns the up-to-date sentinel when nothing newer is published. A
    /// newer release is remembered for [`download_update`](Self::download_update).
    pub async fn check_update(&self) -> Result<Release, UpdateError> {
        let (feed_url, timeout) = {
            let settings = self.settings.read().await;
            (settings.channel.feed_url(&self.config), settings.check_timeout)
        };

        info!(feed = %feed_url, "Checking for updates");
        self.set_state(UpdateState::Checking).await;

        match self.checker.check(&feed_url, timeout).await {
            Ok(release) => {
                *self.last_check.write().await = Some(Utc::now());
                if release.update_available {
                    *self.pending.write().await = Some(release.clone());
                    self.set_state(UpdateState::UpdateAvailable(release.version.clone()))
                        .await;
                } else {
                    *self.pending.write().await = None;
                    self.set_state(UpdateState::UpToDate).await;
                }
                Ok(release)
            }
            Err(e) => {
                error!(error = %e, "Update check failed");
                self.set_state(UpdateState::CheckFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Download and verify the release found by the last check.
    ///
    /// # Errors
    ///
    /// - `NoPendingUpdate` if no check has found an update
    /// - `Timeout` if the transfer exceeds the download timeout
    /// - `Network` / `HttpStatus` on transfer failure
    /// - `SizeMismatch` / `HashMismatch` if the artifact is corrupt
    /// - `Disk` if staging fails
    ///
    /// Nothing is left in the staging directory on failure.
    pub async fn download_update(&self) -> Result<UpdateInfo, UpdateError> {
        self.download_update_with_progress(None).await
    }

    /// [`download_update`](Self::download_update), reporting transfer
    /// progress to `progress`.
    pub async fn download_update_with_progress(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<UpdateInfo, UpdateError> {
        let _download = self.download_lock.lock().await;

        let release = self
            .pending
            .read()
            .await
            .clone()
            .ok_or(UpdateError::NoPendingUpdate)?;
        let asset = release.asset.clone().ok_or(UpdateError::NoPendingUpdate)?;
        let staging_dir = self.staging_dir().await;

        let swept = download::sweep_partials(&staging_dir)?;
        if swept > 0 {
            warn!(count = swept, "Removed interrupted downloads");
        }

        self.set_state(UpdateState::Downloading).await;
        let timeout = self.config.download_timeout();
        let result = tokio::time::timeout(
            timeout,
            self.downloader
                .download_verified(&asset, &staging_dir, progress.as_ref()),
        )
        .await
        .unwrap_or_else(|_| {
            Err(UpdateError::Timeout {
                operation: "download",
                secs: timeout.as_secs(),
            })
        });

        match result {
            Ok(path) => {
                let info = UpdateInfo { path, release };
                *self.staged.write().await = Some(info.clone());
                self.set_state(UpdateState::Staged(info.path.clone())).await;
                Ok(info)
            }
            Err(e) => {
                error!(error = %e, "Update download failed");
                self.set_state(UpdateState::DownloadFailed(e.to_string())).await;
                Err(e)
            }
        }
    }

    /// Start the installer at `path` and return its process id.
    ///
    /// If `path` is the artifact staged by this pipeline it is verified again
    /// first, so a file changed after download is never run.
    pub async fn launch_installer(&self, path: &Path) -> Result<String, UpdateError> {
        let _handoff = self.handoff.lock().await;

        if let Some(staged) = self.staged.read().await.as_ref() {
            if staged.path == path {
                if let Some(asset) = &staged.release.asset {
                    ArtifactVerifier::for_asset(asset)?.verify(path)?;
                }
            }
        }

        let pid = self.launcher.launch(path)?;
        self.set_state(UpdateState::Launched(pid.clone())).await;
        Ok(pid)
    }

    /// Remove the staged artifact and any interrupted downloads.
    ///
    /// Returns the number of files removed.
    pub async fn cleanup(&self) -> Result<usize, UpdateError> {
        let _download = self.download_lock.lock().await;

        let mut removed = download::sweep_partials(&self.staging_dir().await)?;
        if let Some(staged) = self.staged.write().await.take() {
            match std::fs::remove_file(&staged.path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        if matches!(self.state().await, UpdateState::Staged(_)) {
            self.set_state(UpdateState::Idle).await;
        }
        info!(removed, "Staging directory cleaned");
        Ok(removed)
    }
}
