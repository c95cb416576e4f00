//! Append-only, human-readable audit trail.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::types::{ExecutionResult, PlanStep};
use crate::io::evidence::EvidenceManifest;

const AUDIT_ENTRY_TEMPLATE: &str = include_str!("templates/audit_entry.txt");
const EXEC_ENTRY_TEMPLATE: &str = include_str!("templates/exec_entry.txt");

/// Render one audit block for a manifest.
pub fn render_audit_entry(manifest: &EvidenceManifest) -> Result<String> {
    render_block(
        "audit_entry",
        AUDIT_ENTRY_TEMPLATE,
        context! { manifest => manifest },
    )
}

/// Render one audit block for a single `fde exec` step.
pub fn render_exec_entry(
    timestamp: &str,
    step: &PlanStep,
    result: &ExecutionResult,
) -> Result<String> {
    render_block(
        "exec_entry",
        EXEC_ENTRY_TEMPLATE,
        context! { timestamp => timestamp, step => step, result => result },
    )
}

/// Append one block to the audit log, creating the file and its parent if needed.
pub fn append_audit_entry(path: &Path, manifest: &EvidenceManifest) -> Result<()> {
    debug!(path = %path.display(), ticket_id = %manifest.ticket_id, "appending audit entry");
    append_block(path, &render_audit_entry(manifest)?)
}

pub fn append_exec_entry(
    path: &Path,
    timestamp: &str,
    step: &PlanStep,
    result: &ExecutionResult,
) -> Result<()> {
    debug!(path = %path.display(), description = %step.description, "appending exec entry");
    append_block(path, &render_exec_entry(timestamp, step, result)?)
}

fn render_block(name: &str, source: &str, ctx: minijinja::Value) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(name, source)
        .with_context(|| format!("load {name} template"))?;
    let template = env.get_template(name)?;
    let rendered = template
        .render(ctx)
        .with_context(|| format!("render {name}"))?;
    let mut block = rendered.trim_end().to_string();
    block.push_str("\n\n");
    Ok(block)
}

fn append_block(path: &Path, block: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {}", path.display()))?;
    file.write_all(block.as_bytes())
        .with_context(|| format!("append audit log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{
        CommandKind, DeploymentState, Domain, Environment, ExecutionResult, Failure, PlanStep,
        StepStatus,
    };

    fn manifest(ticket_id: &str) -> EvidenceManifest {
        EvidenceManifest {
            ticket_id: ticket_id.to_string(),
            timestamp: "2026-01-02T03:04:05Z".to_string(),
            environment: Environment::Production,
            client: Some("acme-health".to_string()),
            task: "sync patient records".to_string(),
            domain: Domain::Healthcare,
            plan_title: "Patient Records Sync".to_string(),
            planned: vec![
                PlanStep::shell("Start sync", "echo start"),
                PlanStep::narrative("Handoff: brief on-call"),
            ],
            executed: vec![
                ExecutionResult {
                    description: "Start sync".to_string(),
                    command: Some(CommandKind::Shell),
                    status: StepStatus::Ok,
                    stdout: "start\n".to_string(),
                    stderr: String::new(),
                    meta: None,
                },
                ExecutionResult {
                    description: "Handoff: brief on-call".to_string(),
                    command: None,
                    status: StepStatus::Skipped,
                    stdout: String::new(),
                    stderr: String::new(),
                    meta: None,
                },
            ],
            validation_ok: true,
            status: DeploymentState::Validated,
            rollback_suggestion: None,
            compliance: Vec::new(),
            references: Vec::new(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn renders_results_in_order() {
        let block = render_audit_entry(&manifest("CHG-1")).expect("render");
        assert!(block.starts_with("=== 2026-01-02T03:04:05Z ticket CHG-1 ==="));
        assert!(block.contains("client: acme-health"));
        assert!(block.contains("plan: Patient Records Sync (2 steps)"));
        let first = block.find("[0] ok shell: Start sync").expect("first result");
        let second = block
            .find("[1] skipped narrative: Handoff: brief on-call")
            .expect("second result");
        assert!(first < second);
        assert!(block.contains("validation_ok: true"));
        assert!(block.contains("status: Validated"));
        assert!(!block.contains("rollback:"));
        assert!(block.ends_with("\n\n"));
    }

    #[test]
    fn appends_without_truncating() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("logs/audit.log");
        append_audit_entry(&path, &manifest("CHG-1")).expect("append first");
        append_audit_entry(&path, &manifest("CHG-2")).expect("append second");

        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.matches("=== ").count(), 2);
        let first = contents.find("ticket CHG-1").expect("first");
        let second = contents.find("ticket CHG-2").expect("second");
        assert!(first < second);
    }

    #[test]
    fn exec_entry_follows_manifest_entries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("audit.log");
        let step = PlanStep::shell("exit 3", "exit 3");
        let result = ExecutionResult {
            description: "exit 3".to_string(),
            command: Some(CommandKind::Shell),
            status: StepStatus::Failed(Failure::Code(3)),
            stdout: String::new(),
            stderr: String::new(),
            meta: None,
        };
        append_audit_entry(&path, &manifest("CHG-1")).expect("append manifest");
        append_exec_entry(&path, "2026-01-02T04:00:00Z", &step, &result).expect("append exec");

        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.ends_with(
            "=== 2026-01-02T04:00:00Z exec ===\nshell: exit 3\nstatus: failed(3)\n\n"
        ));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        // A directory cannot be opened for appending.
        assert!(append_audit_entry(temp.path(), &manifest("CHG-1")).is_err());
    }
}
