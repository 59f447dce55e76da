use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{Error, Result};

const BINARY: &str = "wkhtmltopdf";

/// Converts printable HTML to PDF by piping it through `wkhtmltopdf`.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    binary: Option<PathBuf>,
}

impl PdfRenderer {
    /// Use the configured executable, or look for `wkhtmltopdf` on `PATH`.
    pub fn new(configured: Option<PathBuf>) -> Self {
        let binary = configured.or_else(find_on_path);
        match &binary {
            Some(path) => tracing::debug!("PDF export via {}", path.display()),
            None => tracing::warn!("{} not found in PATH; PDF export is disabled", BINARY),
        }
        Self { binary }
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { binary: None }
    }

    pub async fn render(&self, html: &str) -> Result<Vec<u8>> {
        let binary = self.binary.as_ref().ok_or_else(|| {
            Error::ExportUnavailable(format!("{} executable not found in PATH", BINARY))
        })?;

        let mut child = Command::new(binary)
            .args([
                "--quiet",
                "--enable-local-file-access",
                "--load-error-handling",
                "ignore",
                "--print-media-type",
                "-",
                "-",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    Error::ExportUnavailable(format!("cannot run {}: {}", binary.display(), e))
                }
                _ => Error::Export(format!("failed to start {}: {}", binary.display(), e)),
            })?;

        // Feed stdin concurrently so a full stdout pipe cannot stall the child.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Export("child stdin unavailable".to_string()))?;
        let input = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::Export(e.to_string()))?;

        if let Ok(Err(e)) = writer.await {
            tracing::warn!("Writing HTML to {} failed: {}", BINARY, e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Export(format!(
                "{} exited with {}: {}",
                BINARY,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

fn find_on_path() -> Option<PathBuf> {
    find_in(std::env::var_os("PATH")?)
}

/// Look up the converter in a `PATH`-style list of directories.
fn find_in(paths: impl AsRef<OsStr>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    which::which_in(BINARY, Some(paths), cwd).ok()
}
