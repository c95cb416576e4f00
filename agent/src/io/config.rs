//! Agent configuration stored under `.fde/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::planner::DEFAULT_HEALTH_URL;
use crate::io::fs::write_atomic;

/// Agent configuration (TOML).
///
/// Edited by operators. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Ceiling for a single shell step.
    pub shell_timeout_secs: u64,

    /// Ceiling for a single git step.
    pub git_timeout_secs: u64,

    /// Ceiling for a single HTTP request.
    pub http_timeout_secs: u64,

    /// Truncate captured stdout/stderr of a step beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Truncate the HTTP body rendered into a step's stdout beyond this many bytes.
    pub http_body_preview_bytes: usize,

    /// Health endpoint requested by executable intents.
    pub health_url: String,

    /// Append-only audit log. Disabled when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_log: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            shell_timeout_secs: 30,
            git_timeout_secs: 30,
            http_timeout_secs: 10,
            output_limit_bytes: 100_000,
            http_body_preview_bytes: 2_000,
            health_url: DEFAULT_HEALTH_URL.to_string(),
            audit_log: None,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shell_timeout_secs == 0 {
            return Err(anyhow!("shell_timeout_secs must be > 0"));
        }
        if self.git_timeout_secs == 0 {
            return Err(anyhow!("git_timeout_secs must be > 0"));
        }
        if self.http_timeout_secs == 0 {
            return Err(anyhow!("http_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.http_body_preview_bytes == 0 {
            return Err(anyhow!("http_body_preview_bytes must be > 0"));
        }
        if self.health_url.trim().is_empty() {
            return Err(anyhow!("health_url must not be empty"));
        }
        Ok(())
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs)
    }

    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf, "toml.tmp")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = AgentConfig {
            audit_log: Some(PathBuf::from("/var/log/fde/audit.log")),
            ..AgentConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "http_timeout_secs = 5\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.http_timeout_secs, 5);
        assert_eq!(cfg.shell_timeout_secs, 30);
        assert_eq!(cfg.audit_log, None);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "shell_timeout_secs = 0\n").expect("write");
        let err = load_config(&path).expect_err("should reject");
        assert!(err.to_string().contains("shell_timeout_secs"));
    }
}
