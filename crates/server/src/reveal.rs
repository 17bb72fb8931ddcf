//! Opening the folder an uploaded file came from in the desktop file manager.
//!
//! Only meaningful when the server runs on the user's own machine.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevealError {
    #[error("original path not recorded for this file")]
    NoOriginalPath,
    #[error("cannot determine the folder of '{0}'")]
    AmbiguousPath(String),
    #[error("no desktop session available to open folders (this only works in a local environment)")]
    Headless,
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Launches the platform file manager on a folder.
#[derive(Debug, Clone)]
pub struct Revealer {
    program: &'static str,
    desktop: bool,
}

impl Revealer {
    /// Pick the file manager for this OS and check for a desktop session.
    pub fn detect() -> Self {
        let program = if cfg!(windows) {
            "explorer"
        } else if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Self { program, desktop: desktop_session_present() }
    }

    /// A revealer that always reports the environment as headless.
    pub fn unavailable() -> Self {
        Self { program: "xdg-open", desktop: false }
    }

    /// Open the folder containing `original_path`; returns the folder opened.
    pub fn reveal(&self, original_path: Option<&str>) -> Result<PathBuf, RevealError> {
        let original = original_path
            .filter(|p| !p.trim().is_empty())
            .ok_or(RevealError::NoOriginalPath)?;
        let folder = parent_folder(original)?;
        if !self.desktop {
            return Err(RevealError::Headless);
        }

        let arg = if cfg!(windows) { folder.replace('/', "\\") } else { folder.clone() };
        let mut child = Command::new(self.program)
            .arg(&arg)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| RevealError::Launch { program: self.program, source })?;
        // The file manager outlives the request; reap it in the background.
        std::thread::spawn(move || {
            let _ = child.wait();
        });

        tracing::info!("opened folder {arg} with {}", self.program);
        Ok(PathBuf::from(arg))
    }
}

/// Parent folder of a client-side path. Either separator is accepted since
/// clients on another OS may have sent the path.
pub fn parent_folder(original: &str) -> Result<String, RevealError> {
    let trimmed = original.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(0) => Ok(trimmed[..1].to_string()),
        Some(i) if !trimmed[..i].ends_with(':') => Ok(trimmed[..i].to_string()),
        // "C:\file.txt" lives in the drive root.
        Some(i) => Ok(trimmed[..=i].to_string()),
        None => Err(RevealError::AmbiguousPath(original.to_string())),
    }
}

fn desktop_session_present() -> bool {
    if cfg!(any(windows, target_os = "macos")) {
        return true;
    }
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
}
