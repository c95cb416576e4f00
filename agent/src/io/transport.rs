//! Transport capability contract consumed by step dispatch.
//!
//! The [`Transport`] trait decouples dispatch from how commands actually reach
//! the outside world. Tests use scripted transports that return predetermined
//! outcomes without spawning processes or opening sockets.
//!
//! `Err` from any method means the transport itself failed (spawn failure,
//! network error, timeout). Non-success exit codes and HTTP statuses are normal
//! `Ok` values.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::io::config::AgentConfig;
use crate::io::git::Git;
use crate::io::http::HttpClient;
use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Exit code and captured output of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Status code and body text of a finished HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    pub status_code: u16,
    pub body: String,
}

/// Capabilities a step dispatcher needs from the outside world.
pub trait Transport {
    fn run_shell(&self, command: &str) -> Result<ProcessOutcome>;
    fn run_http(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpOutcome>;
    fn run_git(&self, args: &[String]) -> Result<ProcessOutcome>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn run_shell(&self, command: &str) -> Result<ProcessOutcome> {
        (**self).run_shell(command)
    }

    fn run_http(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpOutcome> {
        (**self).run_http(method, url, body)
    }

    fn run_git(&self, args: &[String]) -> Result<ProcessOutcome> {
        (**self).run_git(args)
    }
}

/// Transport backed by real subprocesses and a blocking HTTP client.
pub struct SystemTransport {
    workdir: PathBuf,
    config: AgentConfig,
    http: HttpClient,
}

impl SystemTransport {
    pub fn new(workdir: impl Into<PathBuf>, config: &AgentConfig) -> Result<Self> {
        Ok(Self {
            workdir: workdir.into(),
            config: config.clone(),
            http: HttpClient::new(config.http_timeout())?,
        })
    }
}

impl Transport for SystemTransport {
    #[instrument(skip_all)]
    fn run_shell(&self, command: &str) -> Result<ProcessOutcome> {
        info!(command, "running shell step");
        let mut cmd = shell_command(command);
        cmd.current_dir(&self.workdir);
        let output = run_command_with_timeout(
            cmd,
            self.config.shell_timeout(),
            self.config.output_limit_bytes,
        )?;
        process_outcome(output, "shell command", self.config.shell_timeout_secs)
    }

    #[instrument(skip_all)]
    fn run_http(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpOutcome> {
        info!(method, url, "running http step");
        let response = self.http.request(method, url, body)?;
        Ok(HttpOutcome {
            status_code: response.status_code,
            body: response.body,
        })
    }

    #[instrument(skip_all)]
    fn run_git(&self, args: &[String]) -> Result<ProcessOutcome> {
        info!(args = %args.join(" "), "running git step");
        let git = Git::new(&self.workdir);
        let output = git.run(
            args,
            self.config.git_timeout(),
            self.config.output_limit_bytes,
        )?;
        process_outcome(output, "git command", self.config.git_timeout_secs)
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Timeouts and signal deaths have no exit code to report; they are transport failures.
fn process_outcome(
    output: CommandOutput,
    label: &str,
    timeout_secs: u64,
) -> Result<ProcessOutcome> {
    if output.timed_out {
        warn!(timeout_secs, "{} timed out", label);
        return Err(anyhow!("{label} timed out after {timeout_secs}s"));
    }
    let stdout = output.stdout_text();
    let stderr = output.stderr_text();
    let exit_code = output
        .status
        .code()
        .ok_or_else(|| anyhow!("{label} terminated by signal"))?;
    Ok(ProcessOutcome {
        exit_code,
        stdout,
        stderr,
    })
}
