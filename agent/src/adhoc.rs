//! One-off step execution for `fde exec`.
//!
//! A single shell, http or git step runs outside any ticket: no plan file, no
//! checkpoint and no manifest. Without `execute` nothing is dispatched and
//! nothing is written.

use std::path::Path;

use anyhow::{Result, anyhow, bail};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::core::invariants::validate_plan;
use crate::core::types::{ExecutionResult, PlanStep, TaskPlan};
use crate::dispatch::Dispatcher;
use crate::io::audit_log::append_exec_entry;
use crate::io::config::AgentConfig;
use crate::io::evidence::now_rfc3339;
use crate::io::transport::Transport;

/// Outcome of one `fde exec` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdhocRun {
    pub timestamp: String,
    pub step: PlanStep,
    /// `None` for a dry run.
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Check a single step and, when `execute` is set, dispatch it.
///
/// Step failures are data in the returned result. `Err` means the step itself
/// is malformed. An audit log that cannot be written becomes a warning.
#[instrument(skip_all, fields(execute = execute, description = %step.description))]
pub fn run_adhoc<T: Transport>(
    config: &AgentConfig,
    step: PlanStep,
    execute: bool,
    audit_log: Option<&Path>,
    transport: T,
) -> Result<AdhocRun> {
    if step.command.is_none() {
        bail!("exec needs a shell command, an http url or git args");
    }
    let check = TaskPlan {
        title: "exec".to_string(),
        steps: vec![step.clone()],
        compliance: Vec::new(),
    };
    let errors = validate_plan(&check);
    if !errors.is_empty() {
        return Err(anyhow!("invalid exec step: {}", errors.join("; ")));
    }

    let timestamp = now_rfc3339();
    if !execute {
        info!("dry run, not executing");
        return Ok(AdhocRun {
            timestamp,
            step,
            result: None,
            warnings: Vec::new(),
        });
    }

    let dispatcher =
        Dispatcher::new(transport).with_body_preview(config.http_body_preview_bytes);
    let result = dispatcher.dispatch(&step);
    info!(status = %result.status, "exec finished");

    let mut warnings = Vec::new();
    let audit_log = audit_log.or(config.audit_log.as_deref());
    if let Some(path) = audit_log
        && let Err(err) = append_exec_entry(path, &timestamp, &step, &result)
    {
        warn!(path = %path.display(), err = %err, "audit log append failed");
        warnings.push(format!("audit log write failed: {err:#}"));
    }

    Ok(AdhocRun {
        timestamp,
        step,
        result: Some(result),
        warnings,
    })
}
