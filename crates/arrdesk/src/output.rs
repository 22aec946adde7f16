//! Output formatting for CLI results
//!
//! Every command renders through [`OutputFormatter`] in one of three formats:
//! - Table: human-readable tables (default)
//! - JSON: the [`JsonResponse`] envelope, for scripting
//! - Quiet: nothing, exit codes only

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrdesk_starr::{ImportReport, Resource, StarrItem};
use arrdesk_store::{ConfigSaved, OptionSpec, SavedInstance, Settings};
use arrdesk_updater::{DownloadProgress, ProgressCallback, Release, UpdateInfo};
use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::error::{AppError, ErrorReply};
use crate::process::AppVersion;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Minimal output - exit codes only
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Standard JSON response wrapper for consistent schema
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    /// Whether the operation was successful
    pub success: bool,
    /// The response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReply>,
    /// ISO 8601 timestamp
    pub timestamp: String,
    /// Command that was executed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl<T: Serialize> JsonResponse<T> {
    /// Create a successful response with command context
    pub fn success(data: T, command: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

impl JsonResponse<()> {
    /// Create an error response with command context
    pub fn failure(error: ErrorReply, command: &str) -> JsonResponse<()> {
        JsonResponse {
            success: false,
            data: None,
            error: Some(error),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: Some(command.to_string()),
        }
    }
}

/// A plain message as JSON data.
#[derive(Debug, Serialize)]
pub struct MessageOutput {
    pub message: String,
}

/// Formats output for different modes
pub struct OutputFormatter {
    format: OutputFormat,
    verbose: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.format == OutputFormat::Quiet
    }

    pub fn format_settings(&self, settings: &Settings) -> String {
        self.render(settings, "config show", || {
            let mut table = property_table();
            let fields = serde_json::to_value(settings).unwrap_or_default();
            if let Some(fields) = fields.as_object() {
                for (key, value) in fields {
                    table.add_row(vec![key.clone(), display_json(value)]);
                }
            }
            if settings.active_instance.is_none() {
                table.add_row(vec!["active_instance", "-"]);
            }
            table.to_string()
        })
    }

    pub fn format_options(&self, options: &[OptionSpec]) -> String {
        #[derive(Serialize)]
        struct OptionOutput<'a> {
            key: &'a str,
            kind: String,
            description: &'a str,
        }

        let rows: Vec<OptionOutput<'_>> = options
            .iter()
            .map(|o| OptionOutput {
                key: o.key,
                kind: format!("{:?}", o.kind),
                description: o.description,
            })
            .collect();

        self.render(&rows, "config options", || {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Option", "Kind", "Description"]);
            for row in &rows {
                table.add_row(vec![row.key, &row.kind, row.description]);
            }
            table.to_string()
        })
    }

    pub fn format_config_saved(&self, saved: &ConfigSaved) -> String {
        self.render(saved, "config set", || {
            let suffix = if saved.applied { "" } else { " (applies on next start)" };
            format!("✓ {}{suffix}", saved.message)
        })
    }

    pub fn format_instances(&self, instances: &[SavedInstance]) -> String {
        let redacted: Vec<SavedInstance> = instances.iter().map(redact).collect();
        self.render(&redacted, "instance list", || {
            if instances.is_empty() {
                return "No instances saved.".to_string();
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["ID", "App", "Name", "URL", "Timeout", "Valid SSL"]);
            for instance in instances {
                let c = &instance.config;
                table.add_row(vec![
                    instance.id.to_string(),
                    c.app.to_string(),
                    c.name.clone(),
                    c.url.clone(),
                    format!("{}s", c.timeout_secs),
                    c.valid_ssl.to_string(),
                ]);
            }
            table.to_string()
        })
    }

    pub fn format_instance(&self, instance: &SavedInstance, command: &str) -> String {
        self.render(&redact(instance), command, || {
            let mut table = property_table();
            let c = &instance.config;
            table.add_row(vec!["ID".to_string(), instance.id.to_string()]);
            table.add_row(vec!["App".to_string(), c.app.to_string()]);
            table.add_row(vec!["Name".to_string(), c.name.clone()]);
            table.add_row(vec!["URL".to_string(), c.url.clone()]);
            table.add_row(vec![
                "API Key".to_string(),
                if c.api_key.is_empty() { "-" } else { "(set)" }.to_string(),
            ]);
            table.to_string()
        })
    }

    pub fn format_items(&self, items: &[StarrItem], resource: Resource) -> String {
        self.render(&items, "starr list", || {
            if items.is_empty() {
                return format!("No {resource}.");
            }
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["ID", "Name", "Implementation"]);
            for item in items {
                let implementation = item
                    .0
                    .get("implementation")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("-");
                table.add_row(vec![
                    item.id().map(|id| id.to_string()).unwrap_or_default(),
                    item.name().to_string(),
                    implementation.to_string(),
                ]);
            }
            table.to_string()
        })
    }

    pub fn format_import_report(&self, report: &ImportReport) -> String {
        self.render(report, "starr import", || {
            let mut lines: Vec<String> = report.imported.iter().map(|m| format!("✓ {m}")).collect();
            lines.extend(
                report
                    .failed
                    .iter()
                    .map(|f| format!("✗ {}: {}", f.name, f.error)),
            );
            if lines.is_empty() {
                return "Nothing to import.".to_string();
            }
            lines.join("\n")
        })
    }

    pub fn format_release(&self, release: &Release) -> String {
        self.render(release, "update check", || {
            if !release.update_available {
                return format!("✓ Up to date ({})", release.version);
            }
            let mut table = property_table();
            table.add_row(vec!["Version".to_string(), release.version.to_string()]);
            table.add_row(vec!["Name".to_string(), release.name.clone()]);
            if let Some(published) = &release.published_at {
                table.add_row(vec!["Published".to_string(), published.to_string()]);
            }
            if let Some(asset) = &release.asset {
                table.add_row(vec!["Asset".to_string(), asset.name.clone()]);
                if let Some(size) = asset.size {
                    table.add_row(vec!["Size".to_string(), format!("{size} bytes")]);
                }
            }
            if !release.page_url.is_empty() {
                table.add_row(vec!["Page".to_string(), release.page_url.clone()]);
            }
            table.to_string()
        })
    }

    pub fn format_update_info(&self, info: &UpdateInfo) -> String {
        self.render(info, "update download", || {
            format!(
                "✓ {} staged at {}",
                info.release.version,
                info.path.display()
            )
        })
    }

    pub fn format_version(&self, version: &AppVersion) -> String {
        self.render(version, "version", || {
            let mut table = property_table();
            table.add_row(vec!["Version", &version.version]);
            table.add_row(vec!["Revision", &version.revision]);
            table.add_row(vec!["Branch", &version.branch]);
            table.add_row(vec!["Build User", &version.build_user]);
            table.add_row(vec!["Build Date", &version.build_date]);
            table.add_row(vec!["Rust", &version.rustc]);
            table.add_row(vec!["Started", &version.started]);
            table.add_row(vec!["Running".to_string(), format!("{}s", version.running_secs)]);
            table.to_string()
        })
    }

    pub fn format_languages(&self, languages: &BTreeMap<String, String>) -> String {
        self.render(languages, "languages", || {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(vec!["Code", "Language"]);
            for (code, name) in languages {
                table.add_row(vec![code, name]);
            }
            table.to_string()
        })
    }

    /// Render a one-line result such as a path or a confirmation.
    pub fn format_message(&self, message: &str, command: &str) -> String {
        let data = MessageOutput {
            message: message.to_string(),
        };
        self.render(&data, command, || message.to_string())
    }

    /// Render a failed command.
    pub fn format_failure(&self, error: &AppError, command: &str) -> String {
        match self.format {
            OutputFormat::Table => format!("✗ Error: {error}"),
            OutputFormat::Json => {
                let response = JsonResponse::failure(error.reply(), command);
                serde_json::to_string_pretty(&response)
                    .unwrap_or_else(|e| format!("{{\"success\": false, \"error\": \"{e}\"}}"))
            }
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Progress note, table mode with `--verbose` only.
    pub fn progress(&self, message: &str) {
        if self.verbose && self.format == OutputFormat::Table {
            eprintln!("... {message}");
        }
    }

    /// Download progress reporter for table output. Prints to stderr each
    /// time the transfer reaches a new tenth.
    pub fn download_progress(&self) -> Option<ProgressCallback> {
        if self.format != OutputFormat::Table {
            return None;
        }
        let last = AtomicU64::new(u64::MAX);
        let report: ProgressCallback = Arc::new(move |progress: DownloadProgress| {
            if crosses_milestone(&progress, &last) {
                eprintln!("... {progress}");
            }
        });
        Some(report)
    }

    /// Print a rendered result unless it is empty.
    pub fn print(&self, rendered: &str) {
        if !rendered.is_empty() {
            println!("{rendered}");
        }
    }

    fn render<T: Serialize>(&self, data: &T, command: &str, table: impl FnOnce() -> String) -> String {
        match self.format {
            OutputFormat::Table => table(),
            OutputFormat::Json => self.to_json_response(data, command),
            OutputFormat::Quiet => String::new(),
        }
    }

    fn to_json_response<T: Serialize>(&self, value: &T, command: &str) -> String {
        let response = JsonResponse::success(value, command);
        serde_json::to_string_pretty(&response).unwrap_or_else(|e| {
            format!("{{\"success\": false, \"error\": \"serialization error: {e}\"}}")
        })
    }
}

fn property_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Property", "Value"]);
    table
}

fn display_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) if s.is_empty() => "\"\"".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Credentials never leave the process through the CLI.
fn redact(instance: &SavedInstance) -> SavedInstance {
    let mut out = instance.clone();
    if !out.config.api_key.is_empty() {
        out.config.api_key = "********".to_string();
    }
    if !out.config.password.is_empty() {
        out.config.password = "********".to_string();
    }
    out
}

/// Whether `progress` has reached a new tenth of the transfer since `last`.
/// Without a known total, every MiB counts.
fn crosses_milestone(progress: &DownloadProgress, last: &AtomicU64) -> bool {
    let mark = match progress.percentage() {
        Some(pct) => (pct / 10.0).floor() as u64,
        None => progress.downloaded / (1024 * 1024),
    };
    last.swap(mark, Ordering::Relaxed) != mark
}
