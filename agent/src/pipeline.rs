//! Orchestration for one `fde run` invocation.
//!
//! Drives classify → plan → execute → validate → record through an explicit
//! [`PipelineContext`], moving the deployment state machine along the way.

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::classifier::classify;
use crate::core::invariants::validate_plan;
use crate::core::planner::Planner;
use crate::core::rollback::suggest_rollback;
use crate::core::state_machine::DeploymentStateMachine;
use crate::core::types::{DeploymentState, Domain, ExecutionResult, Task, TaskPlan};
use crate::core::validator::validate;
use crate::dispatch::Dispatcher;
use crate::io::checkpoint::CheckpointStore;
use crate::io::config::AgentConfig;
use crate::io::evidence::{EvidenceManifest, RecordRequest, record};
use crate::io::paths::{AgentPaths, validate_ticket_id};
use crate::io::plan_store::write_plan;
use crate::io::transport::Transport;
use crate::runner::ResumableRunner;

/// Per-invocation switches.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Run the plan's steps. Without this the pipeline only classifies and plans.
    pub execute: bool,
    /// Discard any checkpoint for the ticket before running.
    pub reset: bool,
    /// Overrides `AgentConfig::audit_log`.
    pub audit_log: Option<PathBuf>,
    /// Execute this plan instead of generating one.
    pub plan: Option<TaskPlan>,
}

/// State carried through one invocation.
#[derive(Debug)]
pub struct PipelineContext {
    pub task: Task,
    pub ticket_id: String,
    pub domain: Domain,
    pub plan: TaskPlan,
    pub machine: DeploymentStateMachine,
    pub results: Vec<ExecutionResult>,
    pub warnings: Vec<String>,
}

/// Everything the caller needs to render the outcome.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub ticket_id: String,
    pub task: Task,
    pub domain: Domain,
    pub plan: TaskPlan,
    pub state: DeploymentState,
    pub state_history: Vec<DeploymentState>,
    /// `None` for a dry run.
    pub execution: Option<ExecutionSummary>,
}

#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub results: Vec<ExecutionResult>,
    pub checkpoint: usize,
    pub executed_now: usize,
    pub validation_ok: bool,
    pub rollback_suggestion: Option<String>,
    pub warnings: Vec<String>,
    pub manifest: EvidenceManifest,
    pub manifest_path: PathBuf,
}

/// Run one task end to end.
///
/// Step failures and a failed validation are reported in the returned
/// [`TaskReport`]. `Err` means the pipeline itself could not proceed (bad
/// ticket id, invalid plan, checkpoint or manifest I/O).
#[instrument(skip_all, fields(execute = options.execute))]
pub fn run_task<S, T>(
    paths: &AgentPaths,
    config: &AgentConfig,
    task: Task,
    options: PipelineOptions,
    store: S,
    transport: T,
) -> Result<TaskReport>
where
    S: CheckpointStore,
    T: Transport,
{
    let mut ctx = plan_task(paths, config, task, options.plan)?;
    if !options.execute {
        info!(ticket_id = %ctx.ticket_id, steps = ctx.plan.steps.len(), "dry run, not executing");
        return Ok(report(ctx, None));
    }

    let ticket = paths.ticket(&ctx.ticket_id);
    if options.reset {
        info!(ticket_id = %ctx.ticket_id, "resetting checkpoint");
        store.clear(&ctx.ticket_id)?;
    }
    let dispatcher =
        Dispatcher::new(transport).with_body_preview(config.http_body_preview_bytes);
    let runner = ResumableRunner::new(store, dispatcher);
    // A plan the checkpoint rejects must not replace the ticket's stored plan.
    runner.resume_point(&ctx.plan, &ctx.ticket_id)?;
    write_plan(&ticket.plan_path, &ctx.plan)?;

    ctx.machine.set_state(DeploymentState::Executing);
    let outcome = runner.run(&ctx.plan, &ctx.ticket_id)?;
    ctx.results = outcome.results;

    let validation_ok = validate(&ctx.plan, &ctx.results);
    ctx.machine.set_state(if validation_ok {
        DeploymentState::Validated
    } else {
        DeploymentState::Failed
    });
    let rollback_suggestion =
        suggest_rollback(validation_ok, &ctx.ticket_id, ctx.task.environment);
    if !validation_ok {
        warn!(
            ticket_id = %ctx.ticket_id,
            halted = outcome.failed,
            checkpoint = outcome.checkpoint,
            "validation failed"
        );
    }

    let audit_log = options.audit_log.or_else(|| config.audit_log.clone());
    let mut references = vec![
        ticket.plan_path.display().to_string(),
        ticket.checkpoint_path.display().to_string(),
    ];
    if let Some(path) = &audit_log {
        references.push(path.display().to_string());
    }
    let recorded = record(
        &ticket.manifest_path,
        audit_log.as_deref(),
        &RecordRequest {
            ticket_id: &ctx.ticket_id,
            task: &ctx.task,
            domain: ctx.domain,
            plan: &ctx.plan,
            results: &ctx.results,
            validation_ok,
            status: ctx.machine.current(),
            rollback_suggestion: rollback_suggestion.as_deref(),
            references,
            warnings: ctx.warnings.clone(),
        },
    )?;
    ctx.warnings = recorded.manifest.warnings.clone();

    let execution = ExecutionSummary {
        results: ctx.results.clone(),
        checkpoint: outcome.checkpoint,
        executed_now: outcome.executed_now,
        validation_ok,
        rollback_suggestion,
        warnings: ctx.warnings.clone(),
        manifest: recorded.manifest,
        manifest_path: recorded.manifest_path,
    };
    Ok(report(ctx, Some(execution)))
}

/// Idle → Planning: resolve the ticket id, classify, and produce the plan.
///
/// A task without a ticket id gets a fresh one that no existing ticket uses.
pub fn plan_task(
    paths: &AgentPaths,
    config: &AgentConfig,
    task: Task,
    plan: Option<TaskPlan>,
) -> Result<PipelineContext> {
    let ticket_id = match &task.ticket_id {
        Some(id) => id.clone(),
        None => paths.unused_ticket_id(),
    };
    validate_ticket_id(&ticket_id)?;

    let mut machine = DeploymentStateMachine::new();
    machine.set_state(DeploymentState::Planning);

    let domain = classify(&task.text);
    let plan = match plan {
        Some(plan) => {
            let errors = validate_plan(&plan);
            if !errors.is_empty() {
                return Err(anyhow!("plan invariants failed: {}", errors.join("; ")));
            }
            plan
        }
        None => Planner::new(config.health_url.clone()).generate(&task, domain),
    };
    info!(
        ticket_id = %ticket_id,
        domain = domain.as_str(),
        title = %plan.title,
        steps = plan.steps.len(),
        executable = plan.executable_count(),
        "planned task"
    );

    Ok(PipelineContext {
        task,
        ticket_id,
        domain,
        plan,
        machine,
        results: Vec::new(),
        warnings: Vec::new(),
    })
}

fn report(ctx: PipelineContext, execution: Option<ExecutionSummary>) -> TaskReport {
    TaskReport {
        ticket_id: ctx.ticket_id,
        task: ctx.task,
        domain: ctx.domain,
        plan: ctx.plan,
        state: ctx.machine.current(),
        state_history: ctx.machine.history().to_vec(),
        execution,
    }
}
