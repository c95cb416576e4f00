//! Test-only transports and fixtures.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use anyhow::{Result, anyhow};

use crate::core::types::{PlanStep, Task, TaskPlan};
use crate::io::checkpoint::{Checkpoint, CheckpointStore};
use crate::io::transport::{HttpOutcome, ProcessOutcome, Transport};

/// One call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedCall {
    Shell(String),
    Http {
        method: String,
        url: String,
        body: Option<String>,
    },
    Git(Vec<String>),
}

/// Canned reply, consumed in FIFO order regardless of which method is called.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Process(ProcessOutcome),
    Http(HttpOutcome),
    Error(String),
}

/// Transport that replays queued replies and records every call.
///
/// A call with no queued reply, or whose reply has the wrong shape, returns an
/// error, which dispatch surfaces as `failed(exception)`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: RefCell<VecDeque<ScriptedReply>>,
    calls: RefCell<Vec<ScriptedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: ScriptedReply) {
        self.replies.borrow_mut().push_back(reply);
    }

    pub fn push_process(&self, exit_code: i32, stdout: &str, stderr: &str) {
        self.push(ScriptedReply::Process(ProcessOutcome {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }));
    }

    pub fn push_http(&self, status_code: u16, body: &str) {
        self.push(ScriptedReply::Http(HttpOutcome {
            status_code,
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, message: &str) {
        self.push(ScriptedReply::Error(message.to_string()));
    }

    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.borrow().clone()
    }

    /// Panics if any queued reply was never consumed.
    pub fn assert_drained(&self) {
        let remaining = self.replies.borrow().len();
        assert_eq!(remaining, 0, "{remaining} scripted replies were not consumed");
    }

    fn next(&self, call: ScriptedCall) -> Result<ScriptedReply> {
        self.calls.borrow_mut().push(call.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted reply for {call:?}"))
    }

    fn next_process(&self, call: ScriptedCall) -> Result<ProcessOutcome> {
        match self.next(call)? {
            ScriptedReply::Process(outcome) => Ok(outcome),
            ScriptedReply::Error(message) => Err(anyhow!(message)),
            ScriptedReply::Http(_) => Err(anyhow!("scripted http reply for process call")),
        }
    }
}

impl Transport for ScriptedTransport {
    fn run_shell(&self, command: &str) -> Result<ProcessOutcome> {
        self.next_process(ScriptedCall::Shell(command.to_string()))
    }

    fn run_http(&self, method: &str, url: &str, body: Option<&str>) -> Result<HttpOutcome> {
        let call = ScriptedCall::Http {
            method: method.to_string(),
            url: url.to_string(),
            body: body.map(str::to_string),
        };
        match self.next(call)? {
            ScriptedReply::Http(outcome) => Ok(outcome),
            ScriptedReply::Error(message) => Err(anyhow!(message)),
            ScriptedReply::Process(_) => Err(anyhow!("scripted process reply for http call")),
        }
    }

    fn run_git(&self, args: &[String]) -> Result<ProcessOutcome> {
        self.next_process(ScriptedCall::Git(args.to_vec()))
    }
}

/// In-memory checkpoint store that keeps every saved snapshot.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    current: RefCell<HashMap<String, Checkpoint>>,
    saves: RefCell<Vec<Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkpoint passed to `save`, oldest first.
    pub fn saves(&self) -> Vec<Checkpoint> {
        self.saves.borrow().clone()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, ticket_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.current.borrow().get(ticket_id).cloned())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.saves.borrow_mut().push(checkpoint.clone());
        self.current
            .borrow_mut()
            .insert(checkpoint.ticket_id.clone(), checkpoint.clone());
        Ok(())
    }

    fn clear(&self, ticket_id: &str) -> Result<()> {
        self.current.borrow_mut().remove(ticket_id);
        Ok(())
    }
}

/// Task text that triggers the executable patient sync intent.
pub fn patient_sync_task(ticket_id: &str) -> Task {
    let mut task = Task::new("Sync patient records for clinic onboarding");
    task.ticket_id = Some(ticket_id.to_string());
    task
}

/// Queue replies that make every step of the patient sync plan succeed.
pub fn script_patient_sync_success(transport: &ScriptedTransport) {
    transport.push_process(0, "Starting patient record sync\n", "");
    transport.push_http(200, "<html>ok</html>");
    transport.push_process(0, "On branch main\n", "");
    transport.push_process(0, "Sync finalized\n", "");
    transport.push_http(200, "<html>ok</html>");
}

/// Plan of shell steps, one per command, named `Step <index>`.
pub fn shell_plan(title: &str, commands: &[&str]) -> TaskPlan {
    TaskPlan {
        title: title.to_string(),
        steps: commands
            .iter()
            .enumerate()
            .map(|(index, command)| PlanStep::shell(format!("Step {index}"), *command))
            .collect(),
        compliance: Vec::new(),
    }
}
