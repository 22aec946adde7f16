//! The command surface the UI binds to.
//!
//! [`App`] owns the two stores, the update pipeline and process control, and
//! forwards dialog and shell actions to their boundary traits. Startup loads
//! both documents (a corrupt one only disables its own store), builds the
//! pipeline from `updater.toml`, and applies the stored settings to the live
//! subsystems. Quit flushes both stores under the installer handoff lock.
//!
//! Settings saved with `apply_now` take effect immediately:
//!
//! | option | effect |
//! |---|---|
//! | `log_level` | tracing filter reloaded |
//! | `updates` | release channel for the next check |
//! | `download_dir` | staging directory for the next download |
//! | `request_timeout_secs` | update check timeout |
//! | `active_instance` | instance receiving reload signals |
//! | `allow_remove_active` | whether the active instance may be removed |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arrdesk_starr::{ImportReport, Resource, StarrClient, StarrItem};
use arrdesk_store::{
    AppConfig, AppPaths, ConfigSaved, ConfigStore, ConfigValue, InstancePolicy, InstanceStore,
    SavedInstance, Settings, StoreError,
};
use arrdesk_updater::{
    ProgressCallback, Release, ReleaseChannel, UpdateConfig, UpdateInfo, UpdatePipeline,
    UpdateState,
};
use semver::Version;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::i18n;
use crate::logging::LogHandle;
use crate::process::{AppVersion, ExitHandler, ProcessControl, ProcessExit};
use crate::shell::{Dialogs, Shell, SystemShell, TerminalDialogs};

/// Boundary implementations the app talks to.
pub struct Services {
    pub dialogs: Arc<dyn Dialogs>,
    pub shell: Arc<dyn Shell>,
    pub exit: Arc<dyn ExitHandler>,
    pub logging: Option<LogHandle>,
}

impl Services {
    /// Terminal dialogs, the host shell, and a real process exit.
    pub fn system(logging: Option<LogHandle>) -> Result<Self, AppError> {
        Ok(Self {
            dialogs: Arc::new(TerminalDialogs::stdio()),
            shell: Arc::new(SystemShell::discover()?),
            exit: Arc::new(ProcessExit),
            logging,
        })
    }
}

pub struct App {
    paths: AppPaths,
    config: ConfigStore,
    instances: InstanceStore,
    pipeline: UpdatePipeline,
    process: ProcessControl,
    dialogs: Arc<dyn Dialogs>,
    shell: Arc<dyn Shell>,
    logging: Option<LogHandle>,
}

/// Version of this build, as the update checker compares it.
pub fn running_version() -> Result<Version, AppError> {
    Version::parse(env!("CARGO_PKG_VERSION")).map_err(|e| AppError::Update(e.into()))
}

impl App {
    /// Load state under `paths` and bring live subsystems in line with it.
    ///
    /// # Errors
    ///
    /// - `Io` if the config directory cannot be created
    /// - `Update(Config)` if `updater.toml` is invalid
    pub async fn open(paths: AppPaths, services: Services) -> Result<Self, AppError> {
        std::fs::create_dir_all(&paths.config_dir)?;

        let config = ConfigStore::new(paths.settings_file.clone());
        let settings = match config.load().await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Settings unavailable, running with defaults");
                Settings::default()
            }
        };

        let instances = InstanceStore::new(paths.instances_file.clone());
        match instances.load().await {
            Ok(count) => debug!(count, "Instances loaded"),
            Err(e) => warn!(error = %e, "Instances unavailable"),
        }

        let update_config = UpdateConfig::load_or_default(&paths.updater_file)?;
        let pipeline = UpdatePipeline::new(
            update_config,
            running_version()?,
            paths.staging_for(&settings.download_dir),
        )?;
        let process = ProcessControl::new(pipeline.handoff_lock(), services.exit);

        let app = Self {
            paths,
            config,
            instances,
            pipeline,
            process,
            dialogs: services.dialogs,
            shell: services.shell,
            logging: services.logging,
        };
        app.apply_startup(&settings).await;

        info!(config_dir = %app.paths.config_dir.display(), "arrdesk ready");
        Ok(app)
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub fn pipeline(&self) -> &UpdatePipeline {
        &self.pipeline
    }

    pub fn is_windows(&self) -> bool {
        cfg!(windows)
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub async fn get_config(&self) -> Result<Settings, AppError> {
        Ok(self.config.get_config().await?)
    }

    /// Save one option. With `apply_now` its live effect happens before
    /// this returns.
    pub async fn save_config_item(
        &self,
        key: &str,
        value: ConfigValue,
        apply_now: bool,
    ) -> Result<ConfigSaved, AppError> {
        let saved = self.config.save_config_item(key, value, apply_now).await?;
        if apply_now {
            self.apply_option(key, &self.config.live()).await;
        }
        Ok(saved)
    }

    async fn apply_startup(&self, settings: &Settings) {
        for key in [
            "updates",
            "download_dir",
            "request_timeout_secs",
            "active_instance",
            "allow_remove_active",
        ] {
            self.apply_option(key, settings).await;
        }

        match &self.logging {
            Some(logging) if !logging.is_pinned() => self.apply_option("log_level", settings).await,
            Some(logging) => debug!(level = %logging.level(), "Log level pinned at startup"),
            None => {}
        }
    }

    async fn apply_option(&self, key: &str, settings: &Settings) {
        match key {
            "log_level" => {
                if let Some(logging) = &self.logging {
                    if let Err(e) = logging.set_level(&settings.log_level) {
                        warn!(error = %e, "Log level not applied");
                    }
                }
            }
            "updates" => match settings.updates.parse::<ReleaseChannel>() {
                Ok(channel) => self.pipeline.set_channel(channel).await,
                Err(e) => warn!(error = %e, "Release channel not applied"),
            },
            "download_dir" => {
                self.pipeline
                    .set_staging_dir(self.paths.staging_for(&settings.download_dir))
                    .await
            }
            "request_timeout_secs" => {
                self.pipeline
                    .set_check_timeout(Duration::from_secs(settings.request_timeout_secs))
                    .await
            }
            "active_instance" => self.instances.set_active(settings.active_instance).await,
            "allow_remove_active" => {
                self.instances
                    .set_policy(InstancePolicy {
                        allow_remove_active: settings.allow_remove_active,
                    })
                    .await
            }
            _ => {}
        }
    }

    // =========================================================================
    // Instances
    // =========================================================================

    pub async fn list_instances(&self) -> Result<Vec<SavedInstance>, AppError> {
        Ok(self.instances.list().await?)
    }

    pub async fn save_instance(
        &self,
        id: i64,
        config: AppConfig,
        apply_now: bool,
    ) -> Result<SavedInstance, AppError> {
        Ok(self.instances.save_instance(id, config, apply_now).await?)
    }

    /// Remove an instance. If settings name it as the active instance, the
    /// stored selection is cleared too so a later instance reusing the id
    /// does not inherit it.
    pub async fn remove_instance(&self, id: i64, name: &str) -> Result<SavedInstance, AppError> {
        let removed = self.instances.remove_instance(id, name).await?;

        match self.config.get_config().await {
            Ok(settings) if settings.active_instance == Some(id) => {
                self.save_config_item("active_instance", ConfigValue::from(""), true)
                    .await?;
                info!(id, "Cleared the stored active instance");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, id, "Stored active instance not checked"),
        }

        Ok(removed)
    }

    // =========================================================================
    // Instance resources
    // =========================================================================

    async fn starr_client(&self, id: i64) -> Result<StarrClient, AppError> {
        let instance = self
            .instances
            .get(id)
            .await?
            .ok_or(StoreError::NotFound(id))?;
        Ok(StarrClient::new(&instance.config)?)
    }

    /// Fetch quality profiles, metadata profiles or download clients from
    /// instance `id`.
    pub async fn list_resource(&self, id: i64, resource: Resource) -> Result<Vec<StarrItem>, AppError> {
        Ok(self.starr_client(id).await?.list(resource).await?)
    }

    /// Delete item `item_id` on instance `id`. Returns the confirmation
    /// message.
    pub async fn delete_resource(
        &self,
        id: i64,
        resource: Resource,
        item_id: i64,
    ) -> Result<String, AppError> {
        Ok(self.starr_client(id).await?.delete(resource, item_id).await?)
    }

    /// Write the selected items (all when `selected` is empty) to `path`.
    pub async fn export_resource(
        &self,
        id: i64,
        resource: Resource,
        selected: &[i64],
        path: &Path,
    ) -> Result<usize, AppError> {
        Ok(self
            .starr_client(id)
            .await?
            .export(resource, selected, path)
            .await?)
    }

    pub async fn import_resource(
        &self,
        id: i64,
        resource: Resource,
        path: &Path,
    ) -> Result<ImportReport, AppError> {
        if !path.exists() {
            return Err(AppError::PathNotFound(path.display().to_string()));
        }
        Ok(self.starr_client(id).await?.import(resource, path).await?)
    }

    // =========================================================================
    // Updates
    // =========================================================================

    pub async fn check_update(&self) -> Result<Release, AppError> {
        Ok(self.pipeline.check_update().await?)
    }

    pub async fn download_update(&self) -> Result<UpdateInfo, AppError> {
        self.download_update_with_progress(None).await
    }

    /// Download the pending update, reporting transfer progress.
    pub async fn download_update_with_progress(
        &self,
        progress: Option<ProgressCallback>,
    ) -> Result<UpdateInfo, AppError> {
        Ok(self.pipeline.download_update_with_progress(progress).await?)
    }

    /// Start the installer at `path`. Returns the process id.
    pub async fn launch_installer(&self, path: &str) -> Result<String, AppError> {
        if path.trim().is_empty() {
            return Err(AppError::InvalidInput("installer path is empty".into()));
        }
        Ok(self.pipeline.launch_installer(Path::new(path)).await?)
    }

    pub async fn update_state(&self) -> UpdateState {
        self.pipeline.state().await
    }

    /// Remove staged downloads. Returns the number of files removed.
    pub async fn cleanup_updates(&self) -> Result<usize, AppError> {
        Ok(self.pipeline.cleanup().await?)
    }

    // =========================================================================
    // Process
    // =========================================================================

    pub fn version(&self) -> AppVersion {
        self.process.version()
    }

    /// Flush both stores.
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let settings = self.config.flush().await;
        let instances = self.instances.flush().await;
        settings?;
        instances?;
        Ok(())
    }

    /// Flush everything and end the process. Waits for an installer
    /// handoff in progress.
    pub async fn quit(&self) -> i32 {
        self.process.quit(self.shutdown()).await
    }

    // =========================================================================
    // Dialogs and shell
    // =========================================================================

    pub async fn ask(&self, title: &str, message: &str) -> Result<bool, AppError> {
        let (title, message) = (title.to_string(), message.to_string());
        self.with_dialogs(move |dialogs| dialogs.ask(&title, &message))
            .await
    }

    pub async fn error_dialog(&self, title: &str, message: &str) -> Result<(), AppError> {
        warn!(title, message, "Error dialog");
        let (title, message) = (title.to_string(), message.to_string());
        self.with_dialogs(move |dialogs| dialogs.error_dialog(&title, &message))
            .await
    }

    /// Let the user choose a file. `None` if they cancelled.
    ///
    /// # Errors
    ///
    /// `PathNotFound` if the chosen path does not exist.
    pub async fn pick_file(
        &self,
        title: &str,
        filter: &str,
        default_path: &str,
    ) -> Result<Option<PathBuf>, AppError> {
        let (title, filter) = (title.to_string(), filter.to_string());
        let default_path = self.default_dir(default_path);
        let picked = self
            .with_dialogs(move |dialogs| dialogs.pick_file(&title, &filter, &default_path))
            .await?;
        picked.map(|path| existing(path, false)).transpose()
    }

    /// Let the user choose a folder. `None` if they cancelled.
    pub async fn pick_folder(&self, default_path: &str) -> Result<Option<PathBuf>, AppError> {
        let default_path = self.default_dir(default_path);
        let picked = self
            .with_dialogs(move |dialogs| dialogs.pick_folder(&default_path))
            .await?;
        picked.map(|path| existing(path, true)).transpose()
    }

    pub fn open_folder(&self, path: &str) -> Result<String, AppError> {
        let path = existing(PathBuf::from(path), true)?;
        self.shell.open_folder(&path)?;
        Ok(format!("Opening Path: {}", path.display()))
    }

    pub fn create_shortcut(&self) -> Result<PathBuf, AppError> {
        self.shell.create_shortcut()
    }

    pub fn languages(&self) -> BTreeMap<String, String> {
        i18n::languages()
    }

    fn default_dir(&self, requested: &str) -> PathBuf {
        if requested.trim().is_empty() {
            self.paths.config_dir.clone()
        } else {
            PathBuf::from(requested)
        }
    }

    async fn with_dialogs<T, F>(&self, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn Dialogs) -> Result<T, AppError> + Send + 'static,
    {
        let dialogs = Arc::clone(&self.dialogs);
        tokio::task::spawn_blocking(move || f(dialogs.as_ref()))
            .await
            .map_err(|e| AppError::Dialog(e.to_string()))?
    }
}

/// `path` if it exists (and is a directory when `dir` is set).
fn existing(path: PathBuf, dir: bool) -> Result<PathBuf, AppError> {
    match std::fs::metadata(&path) {
        Ok(meta) if dir && !meta.is_dir() => Err(AppError::InvalidInput(format!(
            "{} is not a folder",
            path.display()
        ))),
        Ok(_) => Ok(path),
        Err(_) => Err(AppError::PathNotFound(path.display().to_string())),
    }
}
