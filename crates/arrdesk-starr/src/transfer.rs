//! Export and import of instance resources as JSON files.

use std::fs;
use std::path::Path;

use arrdesk_store::atomic::write_atomic;
use arrdesk_store::StarrApp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{StarrClient, StarrItem};
use crate::error::StarrError;
use crate::resource::Resource;

/// Format version written into every export file.
pub const EXPORT_VERSION: u32 = 1;

/// An exported set of items from one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub version: u32,
    pub app: StarrApp,
    pub resource: Resource,
    /// Label of the instance the items came from.
    pub instance: String,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<StarrItem>,
}

impl ExportFile {
    pub fn new(app: StarrApp, resource: Resource, instance: impl Into<String>, items: Vec<StarrItem>) -> Self {
        Self {
            version: EXPORT_VERSION,
            app,
            resource,
            instance: instance.into(),
            exported_at: Utc::now(),
            items,
        }
    }

    pub fn read(path: &Path) -> Result<Self, StarrError> {
        let data = fs::read(path)?;
        let file: ExportFile = serde_json::from_slice(&data)?;
        if file.version > EXPORT_VERSION {
            return Err(StarrError::Mismatch(format!(
                "export format {} is newer than {EXPORT_VERSION}",
                file.version
            )));
        }
        Ok(file)
    }

    /// Replace `path` with this export.
    pub fn write(&self, path: &Path) -> Result<(), StarrError> {
        let data = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &data)?;
        Ok(())
    }

    /// Check the items can be created on a `app` instance as `resource`.
    ///
    /// Whisparr serves the Sonarr schema, so the two accept each other's
    /// exports.
    pub fn check_target(&self, app: StarrApp, resource: Resource) -> Result<(), StarrError> {
        if self.resource != resource {
            return Err(StarrError::Mismatch(format!(
                "file holds {}, not {resource}",
                self.resource
            )));
        }
        if schema_family(self.app) != schema_family(app) {
            return Err(StarrError::Mismatch(format!(
                "file was exported from {}, cannot import into {app}",
                self.app
            )));
        }
        Ok(())
    }
}

fn schema_family(app: StarrApp) -> StarrApp {
    match app {
        StarrApp::Whisparr => StarrApp::Sonarr,
        other => other,
    }
}

/// Keep the items whose id is in `selected`. An empty selection keeps all.
pub fn select_items(items: Vec<StarrItem>, selected: &[i64]) -> Vec<StarrItem> {
    if selected.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.id().is_some_and(|id| selected.contains(&id)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of an import. One failed item does not stop the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// One message per created item.
    pub imported: Vec<String>,
    pub failed: Vec<ImportFailure>,
}

impl StarrClient {
    /// Write the selected items of `resource` to `path`. Returns how many
    /// were written.
    pub async fn export(&self, resource: Resource, selected: &[i64], path: &Path) -> Result<usize, StarrError> {
        let items = select_items(self.list(resource).await?, selected);
        let count = items.len();

        ExportFile::new(self.app(), resource, self.instance(), items).write(path)?;
        info!(
            app = %self.app(),
            instance = %self.instance(),
            %resource,
            count,
            path = %path.display(),
            "Exported"
        );
        Ok(count)
    }

    /// Create every item in the export at `path` on this instance.
    pub async fn import(&self, resource: Resource, path: &Path) -> Result<ImportReport, StarrError> {
        let file = ExportFile::read(path)?;
        file.check_target(self.app(), resource)?;

        let mut report = ImportReport::default();
        for item in &file.items {
            let name = item.name().to_string();
            match self.add(resource, item).await {
                Ok(_) => report.imported.push(import_message(resource, &name, self.instance())),
                Err(e) => {
                    warn!(%resource, name = %name, error = %e, "Import failed");
                    report.failed.push(ImportFailure {
                        name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            instance = %self.instance(),
            %resource,
            imported = report.imported.len(),
            failed = report.failed.len(),
            "Import finished"
        );
        Ok(report)
    }
}

fn import_message(resource: Resource, name: &str, instance: &str) -> String {
    match resource {
        Resource::QualityProfiles => format!("Imported quality profile '{name}' into {instance}"),
        Resource::MetadataProfiles => format!("Imported metadata profile '{name}' into {instance}"),
        Resource::DownloadClients => format!("Imported download client '{name}' into {instance}"),
    }
}
