//! Resumable, strictly sequential plan execution.
//!
//! After every dispatched step the checkpoint is saved before the next step is
//! considered, so "checkpoint at N" always means steps `0..N` completed without
//! failure. A failed step is recorded but does not advance the checkpoint; the
//! next run for the same ticket retries it.

use anyhow::{Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ExecutionResult, TaskPlan};
use crate::dispatch::Dispatcher;
use crate::io::checkpoint::{Checkpoint, CheckpointStore, plan_fingerprint};
use crate::io::transport::Transport;

/// Result of one `run` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Cumulative results for the ticket, in plan order.
    pub results: Vec<ExecutionResult>,
    pub failed: bool,
    /// Index of the next step to execute.
    pub checkpoint: usize,
    /// Steps dispatched by this call.
    pub executed_now: usize,
}

pub struct ResumableRunner<S, T: Transport> {
    store: S,
    dispatcher: Dispatcher<T>,
}

impl<S: CheckpointStore, T: Transport> ResumableRunner<S, T> {
    pub fn new(store: S, dispatcher: Dispatcher<T>) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    /// Execute the plan from the ticket's checkpoint, halting at the first failure.
    ///
    /// Returns `Err` only for checkpoint I/O problems or a checkpoint that does
    /// not belong to this plan. Step failures are data in the outcome.
    #[instrument(skip_all, fields(ticket_id = %ticket_id, steps = plan.steps.len()))]
    pub fn run(&self, plan: &TaskPlan, ticket_id: &str) -> Result<RunOutcome> {
        let mut checkpoint = self.resume_point(plan, ticket_id)?;
        if checkpoint.next_step > 0 {
            info!(next_step = checkpoint.next_step, "resuming from checkpoint");
        }

        let mut executed_now = 0;
        let mut failed = false;
        for (index, step) in plan.steps.iter().enumerate().skip(checkpoint.next_step) {
            debug!(index, description = %step.description, "dispatching step");
            let result = self.dispatcher.dispatch(step);
            executed_now += 1;
            let step_failed = result.status.is_failed();
            info!(index, status = %result.status, "step finished");
            checkpoint.results.push(result);
            if !step_failed {
                checkpoint.next_step = index + 1;
            }
            self.store.save(&checkpoint)?;
            if step_failed {
                warn!(index, "step failed, halting");
                failed = true;
                break;
            }
        }

        Ok(RunOutcome {
            results: checkpoint.results,
            failed,
            checkpoint: checkpoint.next_step,
            executed_now,
        })
    }

    /// Checkpoint `run` would start from, without dispatching anything.
    ///
    /// Fails when the stored checkpoint belongs to a different plan or is
    /// inconsistent with this one.
    pub fn resume_point(&self, plan: &TaskPlan, ticket_id: &str) -> Result<Checkpoint> {
        let fingerprint = plan_fingerprint(plan)?;
        let Some(mut checkpoint) = self.store.load(ticket_id)? else {
            return Ok(Checkpoint::new(ticket_id, &fingerprint));
        };
        if checkpoint.plan_fingerprint != fingerprint {
            bail!("plan changed for ticket '{ticket_id}'; rerun with --reset to start over");
        }
        if checkpoint.next_step > plan.steps.len() {
            bail!(
                "checkpoint for ticket '{ticket_id}' is past the end of the plan ({} > {})",
                checkpoint.next_step,
                plan.steps.len()
            );
        }
        if checkpoint.results.len() < checkpoint.next_step {
            bail!(
                "checkpoint for ticket '{ticket_id}' has {} results for {} completed steps",
                checkpoint.results.len(),
                checkpoint.next_step
            );
        }
        // Drop the failed attempt at `next_step`; it is retried below.
        checkpoint.results.truncate(checkpoint.next_step);
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Failure, StepStatus};
    use crate::io::checkpoint::FileCheckpointStore;
    use crate::test_support::{MemoryCheckpointStore, ScriptedCall, ScriptedTransport, shell_plan};

    type MemoryRunner = ResumableRunner<MemoryCheckpointStore, ScriptedTransport>;

    fn runner(transport: ScriptedTransport) -> MemoryRunner {
        ResumableRunner::new(MemoryCheckpointStore::new(), Dispatcher::new(transport))
    }

    fn file_runner(
        dir: &std::path::Path,
        transport: ScriptedTransport,
    ) -> ResumableRunner<FileCheckpointStore, ScriptedTransport> {
        ResumableRunner::new(FileCheckpointStore::new(dir), Dispatcher::new(transport))
    }

    #[test]
    fn runs_all_steps_and_checkpoints_after_each() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "a\n", "");
        transport.push_process(0, "b\n", "");
        let runner = runner(transport);
        let plan = shell_plan("Two", &["echo a", "echo b"]);

        let outcome = runner.run(&plan, "T1").expect("run");
        assert!(!outcome.failed);
        assert_eq!(outcome.checkpoint, 2);
        assert_eq!(outcome.executed_now, 2);
        assert_eq!(outcome.results.len(), 2);

        let saves = runner.store().saves();
        assert_eq!(
            saves.iter().map(|c| c.next_step).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(saves[0].results.len(), 1);
        runner.dispatcher().transport().assert_drained();
    }

    /// A failure at step 1 halts before step 2 and keeps the checkpoint at 1.
    #[test]
    fn failure_halts_without_advancing() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        transport.push_process(2, "", "boom");
        let runner = runner(transport);
        let plan = shell_plan("Three", &["echo a", "exit 2", "echo c"]);

        let outcome = runner.run(&plan, "T1").expect("run");
        assert!(outcome.failed);
        assert_eq!(outcome.checkpoint, 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[1].status, StepStatus::Failed(Failure::Code(2)));
        assert_eq!(runner.dispatcher().transport().calls().len(), 2);

        let stored = runner.store().load("T1").expect("load").expect("present");
        assert_eq!(stored.next_step, 1);
        assert_eq!(stored.results.len(), 2);
    }

    /// Resume retries only the failed step and returns cumulative results.
    #[test]
    fn resume_retries_failed_step_only() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        transport.push_process(2, "", "boom");
        transport.push_process(0, "", "");
        transport.push_process(0, "", "");
        let runner = runner(transport);
        let plan = shell_plan("Three", &["echo a", "flaky", "echo c"]);

        runner.run(&plan, "T1").expect("first run");
        let outcome = runner.run(&plan, "T1").expect("second run");
        assert!(!outcome.failed);
        assert_eq!(outcome.checkpoint, 3);
        assert_eq!(outcome.executed_now, 2);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.status == StepStatus::Ok));
        assert_eq!(
            runner.dispatcher().transport().calls(),
            vec![
                ScriptedCall::Shell("echo a".to_string()),
                ScriptedCall::Shell("flaky".to_string()),
                ScriptedCall::Shell("flaky".to_string()),
                ScriptedCall::Shell("echo c".to_string()),
            ]
        );
    }

    #[test]
    fn completed_ticket_does_not_redispatch() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        let runner = runner(transport);
        let plan = shell_plan("One", &["echo a"]);

        let first = runner.run(&plan, "T1").expect("first run");
        let second = runner.run(&plan, "T1").expect("second run");
        assert_eq!(second.executed_now, 0);
        assert_eq!(second.checkpoint, 1);
        assert_eq!(second.results, first.results);
        assert_eq!(runner.dispatcher().transport().calls().len(), 1);
    }

    #[test]
    fn changed_plan_is_rejected() {
        let transport = ScriptedTransport::new();
        transport.push_process(2, "", "");
        let runner = runner(transport);
        runner
            .run(&shell_plan("One", &["exit 2"]), "T1")
            .expect("first run");

        let err = runner
            .run(&shell_plan("One", &["echo different"]), "T1")
            .expect_err("should reject");
        assert!(err.to_string().contains("plan changed for ticket 'T1'"));
    }

    #[test]
    fn resume_point_checks_plan_without_dispatching() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        transport.push_process(2, "", "");
        let runner = runner(transport);
        let plan = shell_plan("Two", &["echo a", "exit 2"]);

        let fresh = runner.resume_point(&plan, "T1").expect("fresh ticket");
        assert_eq!(fresh.next_step, 0);
        assert!(runner.store().saves().is_empty());

        runner.run(&plan, "T1").expect("first run");
        let resumed = runner.resume_point(&plan, "T1").expect("same plan");
        assert_eq!(resumed.next_step, 1);
        assert_eq!(resumed.results.len(), 1);

        let err = runner
            .resume_point(&shell_plan("Two", &["echo a", "echo b"]), "T1")
            .expect_err("different plan");
        assert!(err.to_string().contains("plan changed"));
        assert_eq!(runner.dispatcher().transport().calls().len(), 2);
    }

    #[test]
    fn empty_plan_completes_immediately() {
        let runner = runner(ScriptedTransport::new());
        let outcome = runner.run(&shell_plan("Empty", &[]), "T1").expect("run");
        assert_eq!(outcome.checkpoint, 0);
        assert!(!outcome.failed);
        assert!(outcome.results.is_empty());
    }

    /// Checkpoints written to disk survive a fresh runner instance.
    #[test]
    fn file_store_resumes_across_runner_instances() {
        let temp = tempfile::tempdir().expect("tempdir");
        let plan = shell_plan("Two", &["echo a", "exit 1"]);

        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        transport.push_process(1, "", "");
        let first = file_runner(temp.path(), transport);
        assert!(first.run(&plan, "T9").expect("first run").failed);

        let transport = ScriptedTransport::new();
        transport.push_process(0, "", "");
        let second = file_runner(temp.path(), transport);
        let outcome = second.run(&plan, "T9").expect("second run");
        assert!(!outcome.failed);
        assert_eq!(outcome.executed_now, 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(
            second.dispatcher().transport().calls(),
            vec![ScriptedCall::Shell("exit 1".to_string())]
        );
    }
}
