//! Installer handoff.
//!
//! Validates a staged artifact and starts it as a detached process: its own
//! process group, null stdio, and no handle kept. The installer's exit status
//! is never observed.
//!
//! What counts as runnable:
//! - Unix: a regular file with an execute bit set
//! - macOS additionally: `.dmg` and `.pkg` files, opened through `open`
//! - Windows: `.exe` files, and `.msi` files run through `msiexec`

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::error::UpdateError;

#[cfg(windows)]
const DETACHED_PROCESS: u32 = 0x0000_0008;
#[cfg(windows)]
const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

/// Starts installers.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstallerLauncher;

impl InstallerLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Check that `path` is something this platform can run.
    ///
    /// # Errors
    ///
    /// - `NotFound` if nothing exists at `path`
    /// - `NotExecutable` if it is not a regular, runnable file
    pub fn validate(&self, path: &Path) -> Result<(), UpdateError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::NotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(UpdateError::NotExecutable(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        if !is_runnable(path, &metadata) {
            return Err(UpdateError::NotExecutable(path.display().to_string()));
        }
        Ok(())
    }

    /// Start the installer at `path` and return its process id.
    pub fn launch(&self, path: &Path) -> Result<String, UpdateError> {
        self.validate(path)?;

        let mut command = installer_command(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        let child = command
            .spawn()
            .map_err(|e| UpdateError::Launch(format!("{}: {e}", path.display())))?;
        let pid = child.id().to_string();

        info!(path = %path.display(), pid = %pid, "Installer launched");
        Ok(pid)
    }
}

#[cfg(any(target_os = "macos", windows))]
fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(target_os = "macos")]
fn is_opened_package(path: &Path) -> bool {
    matches!(extension(path).as_str(), "dmg" | "pkg")
}

#[cfg(unix)]
fn has_exec_bit(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(target_os = "macos")]
fn is_runnable(path: &Path, metadata: &std::fs::Metadata) -> bool {
    is_opened_package(path) || has_exec_bit(metadata)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn is_runnable(_path: &Path, metadata: &std::fs::Metadata) -> bool {
    has_exec_bit(metadata)
}

#[cfg(windows)]
fn is_runnable(path: &Path, _metadata: &std::fs::Metadata) -> bool {
    matches!(extension(path).as_str(), "exe" | "msi")
}

#[cfg(not(any(unix, windows)))]
fn is_runnable(_path: &Path, _metadata: &std::fs::Metadata) -> bool {
    false
}

#[cfg(target_os = "macos")]
fn installer_command(path: &Path) -> Command {
    if is_opened_package(path) {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else {
        Command::new(path)
    }
}

#[cfg(windows)]
fn installer_command(path: &Path) -> Command {
    if extension(path) == "msi" {
        let mut command = Command::new("msiexec");
        command.arg("/i").arg(path);
        command
    } else {
        Command::new(path)
    }
}

#[cfg(not(any(target_os = "macos", windows)))]
fn installer_command(path: &Path) -> Command {
    Command::new(path)
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_command: &mut Command) {}
