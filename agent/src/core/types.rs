//! Shared deterministic types for the task pipeline.
//!
//! These types define the stable contracts between the classifier, planner,
//! runner, validation gate and evidence recorder. They do not depend on I/O and
//! serialize to the exact shapes persisted in plans, checkpoints and manifests.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

/// Target environment for a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable operator input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub environment: Environment,
    pub client: Option<String>,
    pub ticket_id: Option<String>,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            environment: Environment::default(),
            client: None,
            ticket_id: None,
        }
    }
}

/// Regulatory domain a task falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Healthcare,
    Fintech,
    Government,
    Ecommerce,
    Saas,
    General,
}

impl Domain {
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Healthcare => "healthcare",
            Domain::Fintech => "fintech",
            Domain::Government => "government",
            Domain::Ecommerce => "ecommerce",
            Domain::Saas => "saas",
            Domain::General => "general",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific payload of an executable step.
///
/// Plan files written by other tools may carry kinds this build does not know;
/// those deserialize to [`StepCommand::Unknown`] and are skipped at dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepCommand {
    Shell {
        command: String,
    },
    Http {
        method: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    Git {
        args: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

impl StepCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            StepCommand::Shell { .. } => CommandKind::Shell,
            StepCommand::Http { .. } => CommandKind::Http,
            StepCommand::Git { .. } => CommandKind::Git,
            StepCommand::Unknown => CommandKind::Unknown,
        }
    }
}

/// One unit of work in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<StepCommand>,
}

impl PlanStep {
    /// A narrative step with no command attached.
    pub fn narrative(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: None,
        }
    }

    pub fn shell(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: Some(StepCommand::Shell {
                command: command.into(),
            }),
        }
    }

    pub fn http(
        description: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            command: Some(StepCommand::Http {
                method: method.into(),
                url: url.into(),
                body: None,
            }),
        }
    }

    pub fn git<I, S>(description: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            description: description.into(),
            command: Some(StepCommand::Git {
                args: args.into_iter().map(Into::into).collect(),
            }),
        }
    }

    pub fn kind(&self) -> Option<CommandKind> {
        self.command.as_ref().map(StepCommand::kind)
    }
}

/// Ordered plan for a task. Step order is significant end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub title: String,
    pub steps: Vec<PlanStep>,
    /// Compliance requirements for the task's domain, copied verbatim from the catalog.
    #[serde(default)]
    pub compliance: Vec<String>,
}

impl TaskPlan {
    pub fn executable_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| step.kind().is_some_and(CommandKind::is_executable))
            .count()
    }
}

/// Command kind recorded on a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Shell,
    Http,
    Git,
    Unknown,
}

impl CommandKind {
    /// True for kinds the dispatcher knows how to run.
    pub fn is_executable(self) -> bool {
        !matches!(self, CommandKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Shell => "shell",
            CommandKind::Http => "http",
            CommandKind::Git => "git",
            CommandKind::Unknown => "unknown",
        }
    }
}

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Non-success exit code or HTTP status.
    Code(i64),
    /// The transport itself errored (spawn failure, network error, timeout).
    Exception,
}

/// Step status taxonomy. Serializes as `ok`, `skipped`, `failed(<code>)` or
/// `failed(exception)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StepStatus {
    Skipped,
    Ok,
    Failed(Failure),
}

impl StepStatus {
    pub fn is_failed(self) -> bool {
        matches!(self, StepStatus::Failed(_))
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Skipped => f.write_str("skipped"),
            StepStatus::Ok => f.write_str("ok"),
            StepStatus::Failed(Failure::Code(code)) => write!(f, "failed({code})"),
            StepStatus::Failed(Failure::Exception) => f.write_str("failed(exception)"),
        }
    }
}

impl FromStr for StepStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skipped" => return Ok(StepStatus::Skipped),
            "ok" => return Ok(StepStatus::Ok),
            _ => {}
        }
        let inner = s
            .strip_prefix("failed(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| anyhow!("unrecognized step status '{s}'"))?;
        if inner == "exception" {
            return Ok(StepStatus::Failed(Failure::Exception));
        }
        match inner.parse::<i64>() {
            Ok(code) => Ok(StepStatus::Failed(Failure::Code(code))),
            Err(_) => bail!("unrecognized failure code in step status '{s}'"),
        }
    }
}

impl From<StepStatus> for String {
    fn from(status: StepStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for StepStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Structured metadata attached to a result, per command kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResultMeta {
    Process { exit_code: i32 },
    Http { status_code: u16 },
}

/// Outcome of dispatching one plan step. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub description: String,
    pub command: Option<CommandKind>,
    pub status: StepStatus,
    pub stdout: String,
    pub stderr: String,
    #[serde(default)]
    pub meta: Option<ResultMeta>,
}

/// Pipeline phase for one task invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentState {
    #[default]
    Idle,
    Planning,
    Executing,
    Validated,
    Failed,
}

impl DeploymentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeploymentState::Validated | DeploymentState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentState::Idle => "Idle",
            DeploymentState::Planning => "Planning",
            DeploymentState::Executing => "Executing",
            DeploymentState::Validated => "Validated",
            DeploymentState::Failed => "Failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_strings_match_taxonomy() {
        assert_eq!(StepStatus::Ok.to_string(), "ok");
        assert_eq!(StepStatus::Skipped.to_string(), "skipped");
        assert_eq!(
            StepStatus::Failed(Failure::Code(2)).to_string(),
            "failed(2)"
        );
        assert_eq!(
            StepStatus::Failed(Failure::Exception).to_string(),
            "failed(exception)"
        );
    }

    #[test]
    fn step_status_parses_failure_codes() {
        let status: StepStatus = "failed(404)".parse().expect("parse");
        assert_eq!(status, StepStatus::Failed(Failure::Code(404)));
        assert!("failed(oops)".parse::<StepStatus>().is_err());
        assert!("done".parse::<StepStatus>().is_err());
    }

    #[test]
    fn step_command_serializes_with_kind_tag() {
        let step = PlanStep::git("Check repo status", ["status"]);
        let json = serde_json::to_value(&step).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "description": "Check repo status",
                "command": { "kind": "git", "args": ["status"] }
            })
        );
    }

    #[test]
    fn unknown_command_kind_deserializes_to_unknown() {
        let raw = r#"{"description":"Page someone","command":{"kind":"pager","to":"oncall"}}"#;
        let step: PlanStep = serde_json::from_str(raw).expect("parse");
        assert_eq!(step.command, Some(StepCommand::Unknown));
        assert_eq!(step.kind(), Some(CommandKind::Unknown));
    }

    #[test]
    fn narrative_step_omits_command() {
        let json = serde_json::to_string(&PlanStep::narrative("Discovery")).expect("serialize");
        assert_eq!(json, r#"{"description":"Discovery"}"#);
    }
}
