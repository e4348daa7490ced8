//! Helpers for running external tools (ffmpeg, yt-dlp) to completion

use crate::error::MediaToolError;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// Captured result of one external tool invocation
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// stdout followed by stderr, trimmed
    pub fn combined_log(&self) -> String {
        let mut log = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        log.push_str(self.stdout.trim_end());
        if !log.is_empty() && !self.stderr.trim().is_empty() {
            log.push('\n');
        }
        log.push_str(self.stderr.trim_end());
        log
    }

    /// Turn a non-zero exit into `ProcessFailed`, keeping the whole log
    pub fn check(self, tool: &str) -> Result<Self, MediaToolError> {
        if self.status.success() {
            Ok(self)
        } else {
            Err(MediaToolError::ProcessFailed {
                tool: tool.to_string(),
                code: self.status.code(),
                log: self.combined_log(),
            })
        }
    }
}

/// Build a command for an external tool with stdin closed and output piped
pub fn command(program: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run `program` with `args` and wait for it to exit.
///
/// A binary that cannot be spawned is reported as an environment error;
/// the exit status is returned untouched for the caller to judge.
pub async fn run_tool<I, S>(tool: &str, program: &Path, args: I) -> Result<ToolOutput, MediaToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    debug!("Running {} {:?}", program.display(), args);

    let output = command(program)
        .args(&args)
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => MediaToolError::Environment(format!(
                "{} not found at {}: {}",
                tool,
                program.display(),
                e
            )),
            _ => MediaToolError::IoError(e),
        })?;

    Ok(ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
