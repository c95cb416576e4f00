//! Evidence manifest: the durable plan-vs-actual record for a ticket.
//!
//! One manifest per ticket id, fully overwritten on every executed run. Reads
//! are validated against the embedded JSON Schema before deserializing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::types::{
    DeploymentState, Domain, Environment, ExecutionResult, PlanStep, Task, TaskPlan,
};
use crate::io::audit_log::append_audit_entry;
use crate::io::fs::write_atomic;

const MANIFEST_SCHEMA: &str = include_str!("../../schemas/evidence_manifest.schema.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    pub ticket_id: String,
    /// RFC 3339 UTC, second precision.
    pub timestamp: String,
    pub environment: Environment,
    pub client: Option<String>,
    pub task: String,
    pub domain: Domain,
    pub plan_title: String,
    pub planned: Vec<PlanStep>,
    pub executed: Vec<ExecutionResult>,
    pub validation_ok: bool,
    pub status: DeploymentState,
    pub rollback_suggestion: Option<String>,
    pub compliance: Vec<String>,
    pub references: Vec<String>,
    pub warnings: Vec<String>,
}

/// Inputs for one manifest.
pub struct RecordRequest<'a> {
    pub ticket_id: &'a str,
    pub task: &'a Task,
    pub domain: Domain,
    pub plan: &'a TaskPlan,
    pub results: &'a [ExecutionResult],
    pub validation_ok: bool,
    pub status: DeploymentState,
    pub rollback_suggestion: Option<&'a str>,
    pub references: Vec<String>,
    pub warnings: Vec<String>,
}

impl EvidenceManifest {
    pub fn from_request(request: &RecordRequest<'_>) -> Self {
        Self {
            ticket_id: request.ticket_id.to_string(),
            timestamp: now_rfc3339(),
            environment: request.task.environment,
            client: request.task.client.clone(),
            task: request.task.text.clone(),
            domain: request.domain,
            plan_title: request.plan.title.clone(),
            planned: request.plan.steps.clone(),
            executed: request.results.to_vec(),
            validation_ok: request.validation_ok,
            status: request.status,
            rollback_suggestion: request.rollback_suggestion.map(str::to_string),
            compliance: request.plan.compliance.clone(),
            references: request.references.clone(),
            warnings: request.warnings.clone(),
        }
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Where a record landed.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub manifest: EvidenceManifest,
    pub manifest_path: PathBuf,
}

/// Write the manifest for `request` and, if configured, append it to the audit log.
///
/// Only the manifest write can fail the call. An audit log failure is logged and
/// added to the manifest's `warnings`.
pub fn record(
    manifest_path: &Path,
    audit_log: Option<&Path>,
    request: &RecordRequest<'_>,
) -> Result<Recorded> {
    let mut manifest = EvidenceManifest::from_request(request);
    if let Some(audit_log) = audit_log
        && let Err(err) = append_audit_entry(audit_log, &manifest)
    {
        warn!(path = %audit_log.display(), err = %err, "audit log append failed");
        manifest
            .warnings
            .push(format!("audit log write failed: {err:#}"));
    }
    write_manifest(manifest_path, &manifest)?;
    Ok(Recorded {
        manifest,
        manifest_path: manifest_path.to_path_buf(),
    })
}

/// Overwrite the manifest at `path`.
pub fn write_manifest(path: &Path, manifest: &EvidenceManifest) -> Result<()> {
    info!(
        ticket_id = %manifest.ticket_id,
        validation_ok = manifest.validation_ok,
        path = %path.display(),
        "writing evidence manifest"
    );
    let mut buf = serde_json::to_string_pretty(manifest).context("serialize manifest")?;
    buf.push('\n');
    write_atomic(path, &buf, "json.tmp")
}

/// Load a manifest, validating it against the manifest schema first.
pub fn load_manifest(path: &Path) -> Result<EvidenceManifest> {
    debug!(path = %path.display(), "loading evidence manifest");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    validate_schema(&value)?;
    serde_json::from_value(value)
        .with_context(|| format!("deserialize manifest {}", path.display()))
}

fn validate_schema(manifest: &Value) -> Result<()> {
    let schema_value: Value =
        serde_json::from_str(MANIFEST_SCHEMA).context("parse manifest schema")?;
    let compiled =
        validator_for(&schema_value).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(manifest) {
        let messages = compiled
            .iter_errors(manifest)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "manifest schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}
