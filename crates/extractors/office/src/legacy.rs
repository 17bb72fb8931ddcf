use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("converter executable not found: {0}")]
    NotFound(String),
    #[error("converter exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("converter timed out after {0:?}")]
    TimedOut(Duration),
    #[error("converted text not found at {0}")]
    MissingOutput(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can turn a legacy `.doc` into plain text on disk.
pub trait DocConverter: Send + Sync {
    /// Convert `input`, writing `<out_dir>/<input stem>.txt`. Must give up
    /// once `timeout` has elapsed.
    fn convert(&self, input: &Path, out_dir: &Path, timeout: Duration) -> Result<(), ConvertError>;
}

/// LibreOffice in headless mode.
#[derive(Debug, Clone)]
pub struct LibreOffice {
    program: String,
}

impl LibreOffice {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    /// The executable name/path LibreOffice is usually found under on this OS.
    pub fn platform_default() -> Self {
        let program = if cfg!(windows) {
            "soffice.exe"
        } else if cfg!(target_os = "macos") {
            "/Applications/LibreOffice.app/Contents/MacOS/soffice"
        } else {
            "libreoffice"
        };
        Self::new(program)
    }
}

impl DocConverter for LibreOffice {
    fn convert(&self, input: &Path, out_dir: &Path, timeout: Duration) -> Result<(), ConvertError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("txt:Text")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);
        info!("running {} --headless --convert-to txt:Text on {}", self.program, input.display());
        run_with_timeout(cmd, timeout, &self.program)
    }
}

/// Run `cmd` to completion, killing it once `timeout` has passed.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration, program: &str) -> Result<(), ConvertError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ConvertError::NotFound(program.to_string()),
        _ => ConvertError::Io(e),
    })?;

    // Drain stderr on a separate thread so a chatty child cannot block on a full pipe.
    let stderr_reader = child.stderr.take().map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).trim().to_string()
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ConvertError::TimedOut(timeout));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stderr = stderr_reader
        .and_then(|h| h.join().ok())
        .unwrap_or_default();
    if status.success() {
        Ok(())
    } else {
        Err(ConvertError::Failed { code: status.code(), stderr })
    }
}

/// Extract text from a legacy `.doc` through `converter`.
///
/// The upload is written to a uniquely named temp file and converted into a
/// fresh temp directory; both are removed when this returns, whatever the
/// outcome.
pub fn extract_from_bytes(
    bytes: &[u8],
    converter: &dyn DocConverter,
    timeout: Duration,
) -> Result<String, ConvertError> {
    let mut input = tempfile::Builder::new()
        .prefix("docfind-")
        .suffix(".doc")
        .tempfile()?;
    input.write_all(bytes)?;
    input.flush()?;
    // Close our handle so the converter can open the file on every platform.
    let input = input.into_temp_path();
    let out_dir = tempfile::Builder::new().prefix("docfind-out-").tempdir()?;

    converter.convert(&input, out_dir.path(), timeout)?;

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = out_dir.path().join(format!("{stem}.txt"));
    if !output.is_file() {
        return Err(ConvertError::MissingOutput(output));
    }
    let text = std::fs::read(&output)?;
    Ok(docfind_extract_text::normalize(&text))
}

/// Log a conversion failure with a message specific to its kind.
pub fn log_failure(name: &str, err: &ConvertError) {
    match err {
        ConvertError::NotFound(program) => error!(
            "cannot convert {name}: '{program}' not found; install LibreOffice or set extract.converter"
        ),
        ConvertError::TimedOut(after) => warn!("conversion of {name} timed out after {after:?}"),
        ConvertError::Failed { code, stderr } => {
            warn!("conversion of {name} failed with exit code {code:?}: {stderr}")
        }
        ConvertError::MissingOutput(path) => {
            warn!("conversion of {name} produced no text at {}", path.display())
        }
        ConvertError::Io(e) => warn!("conversion of {name} failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records the paths it was handed and optionally writes a result.
    struct StubConverter {
        output: Option<&'static [u8]>,
        fail: bool,
        seen: Mutex<Option<(PathBuf, PathBuf)>>,
    }

    impl StubConverter {
        fn new(output: Option<&'static [u8]>, fail: bool) -> Self {
            Self { output, fail, seen: Mutex::new(None) }
        }

        fn seen(&self) -> (PathBuf, PathBuf) {
            self.seen.lock().unwrap().clone().expect("converter was called")
        }
    }

    impl DocConverter for StubConverter {
        fn convert(&self, input: &Path, out_dir: &Path, _timeout: Duration) -> Result<(), ConvertError> {
            *self.seen.lock().unwrap() = Some((input.to_path_buf(), out_dir.to_path_buf()));
            assert!(input.is_file());
            if self.fail {
                return Err(ConvertError::Failed { code: Some(1), stderr: "boom".into() });
            }
            if let Some(body) = self.output {
                let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
                std::fs::write(out_dir.join(format!("{stem}.txt")), body)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_extract_and_cleanup() {
        let stub = StubConverter::new(Some(b"line one\r\nline two"), false);
        let text = extract_from_bytes(b"\xD0\xCF\x11\xE0fake doc", &stub, Duration::from_secs(5)).unwrap();
        assert_eq!(text, "line one\nline two");

        let (input, out_dir) = stub.seen();
        assert!(!input.exists());
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_cleanup_on_failure() {
        let stub = StubConverter::new(None, true);
        let err = extract_from_bytes(b"doc", &stub, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ConvertError::Failed { code: Some(1), .. }));

        let (input, out_dir) = stub.seen();
        assert!(!input.exists());
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_missing_output() {
        let stub = StubConverter::new(None, false);
        let err = extract_from_bytes(b"doc", &stub, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ConvertError::MissingOutput(_)));
        let (_, out_dir) = stub.seen();
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_unique_temp_paths() {
        let a = StubConverter::new(Some(b"a"), false);
        let b = StubConverter::new(Some(b"b"), false);
        extract_from_bytes(b"doc", &a, Duration::from_secs(5)).unwrap();
        extract_from_bytes(b"doc", &b, Duration::from_secs(5)).unwrap();
        assert_ne!(a.seen().0, b.seen().0);
        assert_ne!(a.seen().1, b.seen().1);
    }

    #[test]
    fn test_missing_executable() {
        let lo = LibreOffice::new("docfind-no-such-converter-binary");
        let err = extract_from_bytes(b"doc", &lo, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, ConvertError::NotFound(ref p) if p == "docfind-no-such-converter-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("sleep 5");
        let started = Instant::now();
        let err = run_with_timeout(cmd, Duration::from_millis(200), "sh").unwrap_err();
        assert!(matches!(err, ConvertError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_keeps_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo boom >&2; exit 3");
        match run_with_timeout(cmd, Duration::from_secs(5), "sh") {
            Err(ConvertError::Failed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
