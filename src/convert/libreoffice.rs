//! Headless LibreOffice converter

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::{expected_pdf_path, DocumentConverter};
use crate::config::ConverterConfig;
use crate::error::{AppError, Result};

/// Name of the per-job LibreOffice profile directory
const PROFILE_DIR: &str = ".lo-profile";

/// Runs `libreoffice --headless --convert-to pdf` as a child process.
///
/// The launcher forks `oosplash` and `soffice.bin`, so on unix the child gets
/// its own process group and the whole group is killed when the timeout
/// expires or when the request future is dropped. Every job uses its own
/// LibreOffice profile inside the job directory; instances sharing a profile
/// refuse to run side by side.
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    program: String,
    leading_args: Vec<String>,
    timeout: Duration,
}

impl LibreOfficeConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.program.clone(),
            leading_args: config.leading_args.clone(),
            timeout: config.timeout,
        }
    }

    fn command(&self, input: &Path, out_dir: &Path) -> Result<Command> {
        let profile = url::Url::from_directory_path(out_dir.join(PROFILE_DIR)).map_err(|_| {
            AppError::Internal(format!(
                "Job directory is not absolute: {}",
                out_dir.display()
            ))
        })?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(format!("-env:UserInstallation={}", profile))
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg(input)
            .arg("--outdir")
            .arg(out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        command.process_group(0);

        Ok(command)
    }
}

#[async_trait]
impl DocumentConverter for LibreOfficeConverter {
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        let started = Instant::now();
        let child = self
            .command(input, out_dir)?
            .spawn()
            .map_err(AppError::ConverterSpawn)?;
        let mut group = ProcessGroup::of(&child);

        // Dropping the wait future drops the child: tokio kills and reaps it,
        // the group guard takes down its descendants.
        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                group.kill();
                tracing::warn!(
                    program = %self.program,
                    input = %input.display(),
                    timeout_secs = self.timeout.as_secs(),
                    "Converter timed out, process killed"
                );
                return Err(AppError::ConversionTimeout(self.timeout.as_secs()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(AppError::ConversionFailed {
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout = %stdout.trim(),
            "Converter finished"
        );

        let pdf_path = expected_pdf_path(input, out_dir);
        if !tokio::fs::try_exists(&pdf_path).await.unwrap_or(false) {
            if !stderr.trim().is_empty() {
                tracing::warn!(stderr = %stderr.trim(), "Converter reported errors");
            }
            return Err(AppError::ConversionOutputMissing(pdf_path));
        }

        Ok(pdf_path)
    }
}

/// Kills the converter's process group when dropped.
///
/// Also sweeps descendants that outlive a converter which exited on its own.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &tokio::process::Child) -> Self {
        Self { pgid: child.id() }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid, "Failed to kill converter process group: {}", e),
    }
}

// Only the direct child is killed, through `kill_on_drop`.
#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
