//! Verified artifact downloader.
//!
//! Streams a release asset into a temp file inside the staging directory,
//! hashing as it goes. Only a fully received, size- and digest-checked file
//! is renamed to its final name. Any early exit, including the future being
//! dropped on timeout, deletes the temp file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::artifact::ArtifactVerifier;
use crate::error::UpdateError;
use crate::release::ReleaseAsset;

/// Prefix of in-flight download files.
pub const PART_PREFIX: &str = ".arrdesk-download-";

/// Suffix of in-flight download files.
pub const PART_SUFFIX: &str = ".part";

/// Receives progress while a download streams.
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Streams release assets into the staging directory.
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Download `asset` into `staging_dir` and verify it.
    ///
    /// Returns the path of the staged artifact. On Unix the file is marked
    /// executable before it is renamed into place. `progress` is called once
    /// before the first chunk and after every chunk.
    ///
    /// # Errors
    ///
    /// - `Network` / `HttpStatus` if the transfer fails
    /// - `SizeMismatch` / `HashMismatch` if verification fails
    /// - `Disk` if the staging directory cannot be written
    pub async fn download_verified(
        &self,
        asset: &ReleaseAsset,
        staging_dir: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<PathBuf, UpdateError> {
        let verifier = ArtifactVerifier::for_asset(asset)?;
        let dest = staging_dir.join(staged_file_name(&asset.name)?);
        std::fs::create_dir_all(staging_dir)?;

        info!(url = %asset.download_url, dest = %dest.display(), "Starting download");

        let response = self.client.get(&asset.download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus {
                url: asset.download_url.clone(),
                status: status.as_u16(),
            });
        }

        let total = verifier.expected_size().or(response.content_length());
        let mut part = tempfile::Builder::new()
            .prefix(PART_PREFIX)
            .suffix(PART_SUFFIX)
            .tempfile_in(staging_dir)?;

        let mut stream = response.bytes_stream();
        let mut hasher = Sha256::new();
        let mut downloaded = 0u64;
        report(progress, downloaded, total);

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| UpdateError::Network(e.to_string()))?;
            downloaded += chunk.len() as u64;

            if let Some(expected) = verifier.expected_size() {
                if downloaded > expected {
                    warn!(expected, downloaded, "Download exceeded expected size");
                    return Err(UpdateError::SizeMismatch {
                        expected,
                        actual: downloaded,
                    });
                }
            }

            hasher.update(&chunk);
            part.write_all(&chunk)?;
            report(progress, downloaded, total);
        }

        part.as_file().sync_all()?;
        verifier.verify_size(downloaded)?;
        let hash: [u8; 32] = hasher.finalize().into();
        verifier.verify_hash(&hash)?;

        make_executable(part.path())?;
        part.persist(&dest).map_err(|e| UpdateError::Disk(e.error))?;

        info!(
            path = %dest.display(),
            size = downloaded,
            sha256 = %hex::encode(hash),
            "Download complete"
        );
        Ok(dest)
    }

}

fn report(progress: Option<&ProgressCallback>, downloaded: u64, total: Option<u64>) {
    if let Some(callback) = progress {
        callback(DownloadProgress { downloaded, total });
    }
}

/// Remove in-flight download files left behind by a crash.
pub fn sweep_partials(staging_dir: &Path) -> Result<usize, UpdateError> {
    let entries = match std::fs::read_dir(staging_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(PART_PREFIX) && name.ends_with(PART_SUFFIX) {
            std::fs::remove_file(entry.path())?;
            debug!(path = %entry.path().display(), "Removed partial download");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Final file name for an asset, without any directory components.
fn staged_file_name(asset_name: &str) -> Result<&str, UpdateError> {
    Path::new(asset_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.starts_with(PART_PREFIX))
        .ok_or_else(|| UpdateError::Parse(format!("unusable asset name: '{asset_name}'")))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), UpdateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), UpdateError> {
    Ok(())
}

/// Download progress information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes to download, if known.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Get download progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded as f64 / total as f64) * 100.0),
        }
    }
}

impl std::fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.total, self.percentage()) {
            (Some(total), Some(pct)) => {
                write!(f, "{}/{} bytes ({:.1}%)", self.downloaded, total, pct)
            }
            _ => write!(f, "{} bytes", self.downloaded),
        }
    }
}
