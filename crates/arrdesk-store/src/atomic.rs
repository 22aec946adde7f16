//! Atomic whole-file replacement.
//!
//! Writes go to a named temp file in the target's own directory, are synced,
//! and are then renamed over the target. Readers see either the old file or
//! the new one. The temp file is removed by its destructor on every early
//! return; leftovers from a crash are swept by [`sweep_stale_temps`].

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, warn};

/// Suffix shared by every temp file this module creates.
pub const TEMP_SUFFIX: &str = ".tmp";

fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{name}.")
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Atomically replace `path` with `data`.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = data.len(), "Atomic write complete");
    Ok(())
}

/// Remove temp files left behind for `path` by an interrupted process.
///
/// Returns the number of files removed.
pub fn sweep_stale_temps(path: &Path) -> usize {
    let dir = parent_dir(path);
    let prefix = temp_prefix(path);
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(file = %name, error = %e, "Could not remove stale temp file"),
            }
        }
    }
    removed
}
