//! Dialogs and OS shell actions.
//!
//! Both are thin boundaries with no state of their own. [`Dialogs`] is
//! implemented by a terminal prompt ([`TerminalDialogs`]) and by a scripted,
//! headless variant ([`ScriptedDialogs`]) for automation and tests.
//! [`SystemShell`] opens folders with the platform file manager and writes a
//! desktop launcher on Linux.
//!
//! Chooser results are plain paths; the caller checks they exist before use.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::AppError;

/// Confirmation, notification and chooser dialogs.
///
/// A chooser returns `None` when the user cancels.
pub trait Dialogs: Send + Sync {
    fn ask(&self, title: &str, message: &str) -> Result<bool, AppError>;

    fn error_dialog(&self, title: &str, message: &str) -> Result<(), AppError>;

    fn pick_file(
        &self,
        title: &str,
        filter: &str,
        default_path: &Path,
    ) -> Result<Option<PathBuf>, AppError>;

    fn pick_folder(&self, default_path: &Path) -> Result<Option<PathBuf>, AppError>;
}

/// OS shell actions.
pub trait Shell: Send + Sync {
    /// Show `path` in the platform file manager.
    fn open_folder(&self, path: &Path) -> Result<(), AppError>;

    /// Create a launcher for the app and return where it was written.
    fn create_shortcut(&self) -> Result<PathBuf, AppError>;
}

/// Whether `path` matches a chooser filter such as `*.exe;*.msi`.
///
/// An empty filter or a `*` pattern matches everything. Patterns are
/// separated by `;` or `,` and compared case-insensitively.
pub fn matches_filter(path: &Path, filter: &str) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return false,
    };

    let mut patterns = filter
        .split([';', ','])
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| !p.is_empty())
        .peekable();
    if patterns.peek().is_none() {
        return true;
    }

    patterns.any(|pattern| match pattern.strip_prefix('*') {
        Some("") | Some(".*") => true,
        Some(suffix) => name.ends_with(suffix),
        None => name == pattern,
    })
}

// =============================================================================
// Terminal dialogs
// =============================================================================

/// Prompts on a line-oriented reader/writer pair, normally stdin/stderr.
pub struct TerminalDialogs {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl TerminalDialogs {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stderr()),
        )
    }

    fn prompt(&self, text: &str) -> Result<Option<String>, AppError> {
        {
            let mut output = self
                .output
                .lock()
                .map_err(|_| AppError::Dialog("output lock poisoned".into()))?;
            write!(output, "{text}").map_err(|e| AppError::Dialog(e.to_string()))?;
            output.flush().map_err(|e| AppError::Dialog(e.to_string()))?;
        }

        let mut input = self
            .input
            .lock()
            .map_err(|_| AppError::Dialog("input lock poisoned".into()))?;
        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AppError::Dialog(e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn resolve(answer: Option<String>, default_path: &Path) -> Option<PathBuf> {
        let answer = answer.filter(|a| !a.is_empty())?;
        let path = PathBuf::from(answer);
        if path.is_relative() && !default_path.as_os_str().is_empty() {
            Some(default_path.join(path))
        } else {
            Some(path)
        }
    }
}

impl Dialogs for TerminalDialogs {
    fn ask(&self, title: &str, message: &str) -> Result<bool, AppError> {
        let answer = self.prompt(&format!("{title}: {message} [y/N] "))?;
        Ok(matches!(
            answer.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }

    fn error_dialog(&self, title: &str, message: &str) -> Result<(), AppError> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| AppError::Dialog("output lock poisoned".into()))?;
        writeln!(output, "✗ {title}: {message}").map_err(|e| AppError::Dialog(e.to_string()))
    }

    fn pick_file(
        &self,
        title: &str,
        filter: &str,
        default_path: &Path,
    ) -> Result<Option<PathBuf>, AppError> {
        let hint = if filter.is_empty() {
            String::new()
        } else {
            format!(" ({filter})")
        };
        let answer = self.prompt(&format!(
            "{title}{hint} [{}]: ",
            default_path.display()
        ))?;

        match Self::resolve(answer, default_path) {
            Some(path) if !matches_filter(&path, filter) => Err(AppError::InvalidInput(format!(
                "{} does not match {filter}",
                path.display()
            ))),
            picked => Ok(picked),
        }
    }

    fn pick_folder(&self, default_path: &Path) -> Result<Option<PathBuf>, AppError> {
        let answer = self.prompt(&format!("Folder [{}]: ", default_path.display()))?;
        Ok(Self::resolve(answer, default_path))
    }
}

// =============================================================================
// Scripted dialogs
// =============================================================================

/// Headless dialogs that answer from queued responses.
///
/// Once a queue runs dry, `ask` answers no and the choosers cancel. Error
/// dialogs are recorded instead of shown.
#[derive(Debug, Default)]
pub struct ScriptedDialogs {
    answers: Mutex<VecDeque<bool>>,
    files: Mutex<VecDeque<PathBuf>>,
    folders: Mutex<VecDeque<PathBuf>>,
    shown: Mutex<Vec<(String, String)>>,
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(self, answer: bool) -> Self {
        if let Ok(mut answers) = self.answers.lock() {
            answers.push_back(answer);
        }
        self
    }

    pub fn with_file(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.push_back(path.into());
        }
        self
    }

    pub fn with_folder(self, path: impl Into<PathBuf>) -> Self {
        if let Ok(mut folders) = self.folders.lock() {
            folders.push_back(path.into());
        }
        self
    }

    /// Error dialogs shown so far, as `(title, message)`.
    pub fn errors_shown(&self) -> Vec<(String, String)> {
        self.shown.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn next<T>(queue: &Mutex<VecDeque<T>>) -> Result<Option<T>, AppError> {
        queue
            .lock()
            .map(|mut q| q.pop_front())
            .map_err(|_| AppError::Dialog("script lock poisoned".into()))
    }
}

impl Dialogs for ScriptedDialogs {
    fn ask(&self, title: &str, _message: &str) -> Result<bool, AppError> {
        let answer = Self::next(&self.answers)?.unwrap_or(false);
        debug!(title, answer, "Scripted confirmation");
        Ok(answer)
    }

    fn error_dialog(&self, title: &str, message: &str) -> Result<(), AppError> {
        self.shown
            .lock()
            .map_err(|_| AppError::Dialog("script lock poisoned".into()))?
            .push((title.to_string(), message.to_string()));
        Ok(())
    }

    fn pick_file(
        &self,
        _title: &str,
        filter: &str,
        _default_path: &Path,
    ) -> Result<Option<PathBuf>, AppError> {
        match Self::next(&self.files)? {
            Some(path) if !matches_filter(&path, filter) => Err(AppError::InvalidInput(format!(
                "{} does not match {filter}",
                path.display()
            ))),
            picked => Ok(picked),
        }
    }

    fn pick_folder(&self, _default_path: &Path) -> Result<Option<PathBuf>, AppError> {
        Self::next(&self.folders)
    }
}

// =============================================================================
// System shell
// =============================================================================

const DESKTOP_FILE: &str = "arrdesk.desktop";

/// Shell actions backed by the host OS.
#[derive(Debug, Clone)]
pub struct SystemShell {
    executable: PathBuf,
    /// Where launchers are written (`~/.local/share/applications` on Linux)
    launcher_dir: PathBuf,
}

impl SystemShell {
    pub fn new(executable: PathBuf, launcher_dir: PathBuf) -> Self {
        Self {
            executable,
            launcher_dir,
        }
    }

    /// Use the running executable and the user's data directory.
    pub fn discover() -> Result<Self, AppError> {
        let executable = std::env::current_exe()?;
        let data_dir = directories::BaseDirs::new()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| AppError::Shell("no home directory".into()))?;
        Ok(Self::new(executable, data_dir.join("applications")))
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn desktop_entry(&self) -> String {
        format!(
            "[Desktop Entry]\nType=Application\nName=arrdesk\nComment=Companion for *arr media servers\nExec=\"{}\"\nTerminal=false\nCategories=Utility;Network;\n",
            self.executable.display()
        )
    }
}

#[cfg(target_os = "macos")]
fn file_manager() -> Command {
    Command::new("open")
}

#[cfg(windows)]
fn file_manager() -> Command {
    Command::new("explorer")
}

#[cfg(not(any(target_os = "macos", windows)))]
fn file_manager() -> Command {
    Command::new("xdg-open")
}

impl Shell for SystemShell {
    fn open_folder(&self, path: &Path) -> Result<(), AppError> {
        let mut command = file_manager();
        command
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
            .spawn()
            .map_err(|e| AppError::Shell(format!("opening {}: {e}", path.display())))?;
        info!(path = %path.display(), "Opened folder");
        Ok(())
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn create_shortcut(&self) -> Result<PathBuf, AppError> {
        use std::os::unix::fs::PermissionsExt;

        std::fs::create_dir_all(&self.launcher_dir)?;
        let path = self.launcher_dir.join(DESKTOP_FILE);
        arrdesk_store::atomic::write_atomic(&path, self.desktop_entry().as_bytes())?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        info!(path = %path.display(), "Shortcut created");
        Ok(path)
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn create_shortcut(&self) -> Result<PathBuf, AppError> {
        debug!(dir = %self.launcher_dir.display(), entry = DESKTOP_FILE, "No launcher format");
        Err(AppError::Unsupported("creating a shortcut"))
    }
}
