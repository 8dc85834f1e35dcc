//! Container runtime boundary.
//!
//! Everything the orchestrator asks of the runtime goes through the
//! [`Runtime`] trait so the state machine can be exercised in tests without a
//! docker daemon. The production implementation shells out to
//! `docker compose`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::Manifest;
use crate::error::{BringupError, Result};

/// Result of a one-shot command run in the context of a service.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub success: bool,
    /// Trimmed tail of the command's output, for error messages.
    pub detail: String,
}

pub trait Runtime: Sync {
    /// One inspection call. No retries — an absent runtime is immediately
    /// fatal since nothing downstream can succeed without it.
    fn check_available(&self) -> Result<()>;

    /// Stop the whole service set. Idempotent; nothing running is not an
    /// error.
    fn stop_all(&self) -> Result<()>;

    /// Issue a start request for one service. Returns once the request is
    /// accepted, not once the service is ready.
    fn start_service(&self, service: &str) -> Result<()>;

    /// Exec a one-shot command inside an already-running service container.
    fn exec(&self, service: &str, command: &[String]) -> Result<ExecResult>;

    /// Run a one-off command in a fresh container for the service.
    fn run_once(&self, service: &str, command: &[String]) -> Result<ExecResult>;

    /// Build the image for one service.
    fn build(&self, service: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// ComposeRuntime
// ---------------------------------------------------------------------------

/// `docker compose` implementation of the runtime boundary.
pub struct ComposeRuntime {
    root: PathBuf,
    compose_file: String,
    project: String,
}

impl ComposeRuntime {
    pub fn new(root: &Path, manifest: &Manifest) -> Self {
        Self {
            root: root.to_path_buf(),
            compose_file: manifest.compose_file.clone(),
            project: manifest.project.clone(),
        }
    }

    fn compose(&self) -> Command {
        let mut cmd = Command::new("docker");
        cmd.current_dir(&self.root);
        cmd.args(["compose", "-f", &self.compose_file, "-p", &self.project]);
        cmd
    }
}

impl Runtime for ComposeRuntime {
    fn check_available(&self) -> Result<()> {
        which::which("docker").map_err(|_| {
            BringupError::RuntimeUnavailable("docker binary not found on PATH".to_string())
        })?;

        let status = Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                BringupError::RuntimeUnavailable(format!("failed to invoke docker: {e}"))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(BringupError::RuntimeUnavailable(
                "docker daemon is not responding; is it running?".to_string(),
            ))
        }
    }

    fn stop_all(&self) -> Result<()> {
        let output = self
            .compose()
            .args(["down", "--remove-orphans"])
            .output()
            .map_err(|e| {
                BringupError::RuntimeUnavailable(format!("failed to invoke docker compose: {e}"))
            })?;

        // `compose down` exits 0 when nothing is running, so any failure here
        // is a genuine runtime problem.
        if output.status.success() {
            Ok(())
        } else {
            Err(BringupError::RuntimeUnavailable(format!(
                "docker compose down failed: {}",
                output_tail(&output.stderr)
            )))
        }
    }

    fn start_service(&self, service: &str) -> Result<()> {
        let output = self
            .compose()
            .args(["up", "-d", service])
            .output()
            .map_err(|e| BringupError::ServiceStart {
                service: service.to_string(),
                reason: format!("failed to invoke docker compose: {e}"),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BringupError::ServiceStart {
                service: service.to_string(),
                reason: output_tail(&output.stderr),
            })
        }
    }

    fn exec(&self, service: &str, command: &[String]) -> Result<ExecResult> {
        let mut cmd = self.compose();
        cmd.args(["exec", "-T", service]);
        cmd.args(command);
        run_capture(cmd)
    }

    fn run_once(&self, service: &str, command: &[String]) -> Result<ExecResult> {
        let mut cmd = self.compose();
        cmd.args(["run", "--rm", "-T", service]);
        cmd.args(command);
        run_capture(cmd)
    }

    fn build(&self, service: &str) -> Result<()> {
        let output = self
            .compose()
            .args(["build", service])
            .output()
            .map_err(|e| BringupError::ServiceStart {
                service: service.to_string(),
                reason: format!("image build failed: {e}"),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(BringupError::ServiceStart {
                service: service.to_string(),
                reason: format!("image build failed: {}", output_tail(&output.stderr)),
            })
        }
    }
}

fn run_capture(mut cmd: Command) -> Result<ExecResult> {
    let output = cmd.output().map_err(|e| {
        BringupError::RuntimeUnavailable(format!("failed to invoke docker compose: {e}"))
    })?;

    let detail = if output.stderr.is_empty() {
        output_tail(&output.stdout)
    } else {
        output_tail(&output.stderr)
    };

    Ok(ExecResult {
        success: output.status.success(),
        detail,
    })
}

fn output_tail(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    trimmed.chars().take(500).collect()
}
