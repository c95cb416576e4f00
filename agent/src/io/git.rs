//! Git adapter for git plan steps.
//!
//! Plan steps carry raw argument lists; this wrapper only pins the working
//! directory and routes the call through the shared timeout helper.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::io::process::{CommandOutput, run_command_with_timeout};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Run `git <args>` and capture its output. A non-zero exit is not an error here.
    #[instrument(skip_all, fields(args = %args.join(" ")))]
    pub fn run(
        &self,
        args: &[String],
        timeout: Duration,
        output_limit_bytes: usize,
    ) -> Result<CommandOutput> {
        debug!(workdir = %self.workdir.display(), "running git");
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.workdir);
        run_command_with_timeout(cmd, timeout, output_limit_bytes)
            .with_context(|| format!("git {}", args.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_git_version() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path());
        let out = git
            .run(&["--version".to_string()], Duration::from_secs(10), 10_000)
            .expect("git --version");
        assert!(out.status.success());
        assert!(out.stdout_text().starts_with("git version"));
    }

    #[test]
    fn status_outside_repo_exits_non_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        let git = Git::new(temp.path());
        let out = git
            .run(&["status".to_string()], Duration::from_secs(10), 10_000)
            .expect("git status");
        assert!(!out.status.success());
        assert!(out.stderr_text().to_lowercase().contains("not a git repository"));
    }
}
