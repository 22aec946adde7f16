//! CLI command definitions and argument parsing

use std::path::PathBuf;

use arrdesk_starr::Resource;
use arrdesk_store::{AppConfig, AppPaths, ConfigValue, StarrApp, OPTIONS};
use clap::{Args, Parser, Subcommand};

use crate::app::{App, Services};
use crate::error::AppError;
use crate::logging::LogHandle;
use crate::output::{OutputFormat, OutputFormatter};
use crate::ExitCode;

/// arrdesk - companion backend for *arr media servers
#[derive(Parser, Debug)]
#[command(name = "arrdesk")]
#[command(version, about = "arrdesk - settings, instances and self-update for *arr companions")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Keep all state under this directory instead of the platform dirs
    #[arg(long, env = "ARRDESK_HOME", global = true)]
    pub home: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show or change settings
    Config(ConfigArgs),
    /// Manage saved instances
    Instance(InstanceArgs),
    /// Profiles and download clients on a saved instance
    Starr(StarrArgs),
    /// Check for, download and install updates
    Update(UpdateArgs),
    /// Show version and build information
    Version,
    /// List supported UI languages
    Languages,
    /// Open a folder in the file manager
    Open {
        /// Folder to open
        path: String,
    },
    /// Create a desktop launcher
    Shortcut,
    /// Show a dialog
    Dialog(DialogArgs),
}

impl Cli {
    /// Level forced by `--debug` / `--verbose`, if any.
    pub fn log_override(&self) -> Option<&'static str> {
        if self.debug {
            Some("debug")
        } else if self.verbose {
            Some("info")
        } else {
            None
        }
    }

    /// Resolve state locations from `--home` or the platform dirs.
    pub fn paths(&self) -> anyhow::Result<AppPaths> {
        match &self.home {
            Some(home) => Ok(AppPaths::from_root(home)),
            None => AppPaths::discover()
                .ok_or_else(|| anyhow::anyhow!("could not determine a config directory; use --home")),
        }
    }

    /// Execute the CLI command
    pub async fn execute(self, logging: Option<LogHandle>) -> anyhow::Result<ExitCode> {
        let paths = self.paths()?;
        let services = Services::system(logging)?;
        let formatter = OutputFormatter::new(self.output, self.verbose);

        let app = match App::open(paths, services).await {
            Ok(app) => app,
            Err(e) => {
                formatter.print(&formatter.format_failure(&e, "open"));
                return Ok(e.exit_code());
            }
        };
        self.execute_with_app(&app, &formatter).await
    }

    /// Execute the CLI command against an opened app
    pub async fn execute_with_app(
        self,
        app: &App,
        formatter: &OutputFormatter,
    ) -> anyhow::Result<ExitCode> {
        let command = self.command.name();
        let result = match self.command {
            Commands::Config(args) => args.execute(app, formatter).await,
            Commands::Instance(args) => args.execute(app, formatter).await,
            Commands::Starr(args) => args.execute(app, formatter).await,
            Commands::Update(args) => args.execute(app, formatter).await,
            Commands::Version => Ok(formatter.format_version(&app.version())),
            Commands::Languages => Ok(formatter.format_languages(&app.languages())),
            Commands::Open { path } => app
                .open_folder(&path)
                .map(|message| formatter.format_message(&message, "open")),
            Commands::Shortcut => app.create_shortcut().map(|path| {
                formatter.format_message(&path.display().to_string(), "shortcut")
            }),
            Commands::Dialog(args) => args.execute(app, formatter).await,
        };

        let code = match result {
            Ok(rendered) => {
                formatter.print(&rendered);
                ExitCode::Success
            }
            Err(e) => {
                let rendered = formatter.format_failure(&e, command);
                if formatter.format() == OutputFormat::Json {
                    println!("{rendered}");
                } else if !rendered.is_empty() {
                    eprintln!("{rendered}");
                }
                e.exit_code()
            }
        };

        app.shutdown().await?;
        Ok(code)
    }
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Config(_) => "config",
            Commands::Instance(_) => "instance",
            Commands::Starr(_) => "starr",
            Commands::Update(_) => "update",
            Commands::Version => "version",
            Commands::Languages => "languages",
            Commands::Open { .. } => "open",
            Commands::Shortcut => "shortcut",
            Commands::Dialog(_) => "dialog",
        }
    }
}

// =============================================================================
// config
// =============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the settings document
    Show,
    /// List the options that can be set
    Options,
    /// Save one option
    Set {
        key: String,
        /// Value: true/false, a number, a JSON list, or text
        value: String,
        /// Only store the value; running subsystems pick it up on next start
        #[arg(long)]
        later: bool,
    },
}

impl ConfigArgs {
    pub async fn execute(self, app: &App, formatter: &OutputFormatter) -> Result<String, AppError> {
        match self.command {
            ConfigCommand::Show => Ok(formatter.format_settings(&app.get_config().await?)),
            ConfigCommand::Options => Ok(formatter.format_options(OPTIONS)),
            ConfigCommand::Set { key, value, later } => {
                let value = ConfigValue::parse_literal(&value);
                let saved = app.save_config_item(&key, value, !later).await?;
                Ok(formatter.format_config_saved(&saved))
            }
        }
    }
}

// =============================================================================
// instance
// =============================================================================

#[derive(Args, Debug)]
pub struct InstanceArgs {
    #[command(subcommand)]
    pub command: InstanceCommand,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// List saved instances
    List,
    /// Create or update an instance
    Save(SaveInstanceArgs),
    /// Remove an instance; its name must match
    Remove {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct SaveInstanceArgs {
    #[arg(long)]
    pub id: i64,
    /// lidarr, prowlarr, radarr, readarr, sonarr or whisparr
    #[arg(long)]
    pub app: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub url: String,
    #[arg(long, default_value = "")]
    pub api_key: String,
    #[arg(long, default_value = "")]
    pub username: String,
    #[arg(long, env = "ARRDESK_INSTANCE_PASSWORD", default_value = "")]
    pub password: String,
    #[arg(long, default_value_t = 15)]
    pub timeout: u64,
    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
    /// Signal a reload if this is the active instance
    #[arg(long)]
    pub apply: bool,
}

impl SaveInstanceArgs {
    fn into_config(self) -> Result<(i64, AppConfig, bool), AppError> {
        let app: StarrApp = self.app.parse().map_err(AppError::InvalidInput)?;
        let mut config = AppConfig::new(app, self.name, self.url);
        config.api_key = self.api_key;
        config.username = self.username;
        config.password = self.password;
        config.timeout_secs = self.timeout;
        config.valid_ssl = !self.insecure;
        Ok((self.id, config, self.apply))
    }
}

impl InstanceArgs {
    pub async fn execute(self, app: &App, formatter: &OutputFormatter) -> Result<String, AppError> {
        match self.command {
            InstanceCommand::List => Ok(formatter.format_instances(&app.list_instances().await?)),
            InstanceCommand::Save(args) => {
                let (id, config, apply) = args.into_config()?;
                let saved = app.save_instance(id, config, apply).await?;
                Ok(formatter.format_instance(&saved, "instance save"))
            }
            InstanceCommand::Remove { id, name } => {
                let removed = app.remove_instance(id, &name).await?;
                Ok(formatter.format_instance(&removed, "instance remove"))
            }
        }
    }
}

// =============================================================================
// starr
// =============================================================================

#[derive(Args, Debug)]
pub struct StarrArgs {
    #[command(subcommand)]
    pub command: StarrCommand,
}

/// `resource` is one of quality-profiles, metadata-profiles or
/// download-clients.
#[derive(Subcommand, Debug)]
pub enum StarrCommand {
    /// List items on an instance
    List {
        #[arg(long)]
        instance: i64,
        resource: Resource,
    },
    /// Delete one item by id
    Delete {
        #[arg(long)]
        instance: i64,
        resource: Resource,
        #[arg(long)]
        id: i64,
    },
    /// Write items to a JSON file
    Export {
        #[arg(long)]
        instance: i64,
        resource: Resource,
        path: PathBuf,
        /// Item ids to export; all when omitted
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
    },
    /// Create the items of an export file on an instance
    Import {
        #[arg(long)]
        instance: i64,
        resource: Resource,
        path: PathBuf,
    },
}

impl StarrArgs {
    pub async fn execute(self, app: &App, formatter: &OutputFormatter) -> Result<String, AppError> {
        match self.command {
            StarrCommand::List { instance, resource } => {
                let items = app.list_resource(instance, resource).await?;
                Ok(formatter.format_items(&items, resource))
            }
            StarrCommand::Delete {
                instance,
                resource,
                id,
            } => {
                let message = app.delete_resource(instance, resource, id).await?;
                Ok(formatter.format_message(&message, "starr delete"))
            }
            StarrCommand::Export {
                instance,
                resource,
                path,
                ids,
            } => {
                let count = app.export_resource(instance, resource, &ids, &path).await?;
                Ok(formatter.format_message(
                    &format!("Exported {count} {resource} to {}", path.display()),
                    "starr export",
                ))
            }
            StarrCommand::Import {
                instance,
                resource,
                path,
            } => {
                let report = app.import_resource(instance, resource, &path).await?;
                Ok(formatter.format_import_report(&report))
            }
        }
    }
}

// =============================================================================
// update
// =============================================================================

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(subcommand)]
    pub command: UpdateCommand,
}

#[derive(Subcommand, Debug)]
pub enum UpdateCommand {
    /// Ask the release feed for a newer version
    Check,
    /// Check, then download and verify the newer version
    Download,
    /// Check, download, start the installer and quit
    Install {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Start an installer that is already on disk
    Launch { path: String },
    /// Remove staged downloads
    Clean,
}

impl UpdateArgs {
    pub async fn execute(self, app: &App, formatter: &OutputFormatter) -> Result<String, AppError> {
        match self.command {
            UpdateCommand::Check => Ok(formatter.format_release(&app.check_update().await?)),
            UpdateCommand::Download => {
                let release = app.check_update().await?;
                if !release.update_available {
                    return Ok(formatter.format_release(&release));
                }
                formatter.progress(&format!("Downloading {}", release.version));
                let info = app
                    .download_update_with_progress(formatter.download_progress())
                    .await?;
                Ok(formatter.format_update_info(&info))
            }
            UpdateCommand::Install { yes } => {
                let release = app.check_update().await?;
                if !release.update_available {
                    return Ok(formatter.format_release(&release));
                }
                let question = format!("Install version {} now?", release.version);
                if !yes && !app.ask("Update", &question).await? {
                    return Ok(formatter.format_message("Update postponed", "update install"));
                }

                let info = app
                    .download_update_with_progress(formatter.download_progress())
                    .await?;
                let path = info.path.display().to_string();
                let pid = app.launch_installer(&path).await?;
                formatter.print(&formatter.format_message(
                    &format!("Installer started (pid {pid})"),
                    "update install",
                ));
                app.quit().await;
                Ok(String::new())
            }
            UpdateCommand::Launch { path } => {
                let pid = app.launch_installer(&path).await?;
                Ok(formatter.format_message(&pid, "update launch"))
            }
            UpdateCommand::Clean => {
                let removed = app.cleanup_updates().await?;
                Ok(formatter.format_message(&format!("Removed {removed} file(s)"), "update clean"))
            }
        }
    }
}

// =============================================================================
// dialog
// =============================================================================

#[derive(Args, Debug)]
pub struct DialogArgs {
    #[command(subcommand)]
    pub command: DialogCommand,
}

#[derive(Subcommand, Debug)]
pub enum DialogCommand {
    /// Yes/no confirmation
    Ask { title: String, message: String },
    /// Show an error
    Error { title: String, message: String },
    /// Choose a file
    PickFile {
        #[arg(long, default_value = "Select a file")]
        title: String,
        /// Patterns such as "*.exe;*.msi"
        #[arg(long, default_value = "")]
        filter: String,
        #[arg(long, default_value = "")]
        default_path: String,
    },
    /// Choose a folder
    PickFolder {
        #[arg(long, default_value = "")]
        default_path: String,
    },
}

impl DialogArgs {
    pub async fn execute(self, app: &App, formatter: &OutputFormatter) -> Result<String, AppError> {
        let picked = |path: Option<PathBuf>| {
            path.map(|p| p.display().to_string()).unwrap_or_default()
        };
        match self.command {
            DialogCommand::Ask { title, message } => {
                let answer = app.ask(&title, &message).await?;
                Ok(formatter.format_message(&answer.to_string(), "dialog ask"))
            }
            DialogCommand::Error { title, message } => {
                app.error_dialog(&title, &message).await?;
                Ok(String::new())
            }
            DialogCommand::PickFile {
                title,
                filter,
                default_path,
            } => {
                let path = app.pick_file(&title, &filter, &default_path).await?;
                Ok(formatter.format_message(&picked(path), "dialog pick-file"))
            }
            DialogCommand::PickFolder { default_path } => {
                let path = app.pick_folder(&default_path).await?;
                Ok(formatter.format_message(&picked(path), "dialog pick-folder"))
            }
        }
    }
}
