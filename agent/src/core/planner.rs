//! Plan generation: a narrative five-phase skeleton with domain injections, or a
//! concrete typed step list when the task matches a known executable intent.
//!
//! Output is a pure function of `(task text, domain, planner settings)`; the same
//! inputs always yield the same steps in the same order.

use crate::core::catalog;
use crate::core::types::{Domain, PlanStep, Task, TaskPlan};

/// Default health endpoint requested by executable intents.
pub const DEFAULT_HEALTH_URL: &str = "http://127.0.0.1:8000/index.html";

/// Phases of the narrative skeleton, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Discovery,
    Validation,
    Execution,
    Verification,
    Handoff,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Discovery,
        Phase::Validation,
        Phase::Execution,
        Phase::Verification,
        Phase::Handoff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Discovery => "Discovery",
            Phase::Validation => "Validation",
            Phase::Execution => "Execution",
            Phase::Verification => "Verification",
            Phase::Handoff => "Handoff",
        }
    }

    fn baseline(self) -> &'static str {
        match self {
            Phase::Discovery => "confirm goals, success criteria, constraints, timeline",
            Phase::Validation => "prepare change request with validation and rollback",
            Phase::Execution => "execute in staging first; capture artifacts and logs",
            Phase::Verification => "explicit checks tied to success criteria; record results",
            Phase::Handoff => "provide runbooks, monitoring guidance, and escalation path",
        }
    }
}

/// Domain-specific steps appended to a phase.
const INJECTIONS: &[(Domain, Phase, &str)] = &[
    (
        Domain::Healthcare,
        Phase::Discovery,
        "identify PHI data flows and confirm Business Associate Agreements",
    ),
    (
        Domain::Healthcare,
        Phase::Validation,
        "verify PHI encryption at rest and in transit (164.312(a)(2)(iv), 164.312(e)(1))",
    ),
    (
        Domain::Healthcare,
        Phase::Verification,
        "confirm audit logs capture all PHI access (164.312(b))",
    ),
    (
        Domain::Healthcare,
        Phase::Handoff,
        "file HIPAA evidence package for compliance review",
    ),
];

/// A recognized operational pattern that maps to concrete typed steps.
struct Intent {
    title: &'static str,
    triggers: &'static [&'static str],
    build: fn(&Planner) -> Vec<PlanStep>,
}

const INTENTS: &[Intent] = &[Intent {
    title: "Patient Records Sync",
    triggers: &["sync patient records", "patient sync"],
    build: patient_sync_steps,
}];

fn patient_sync_steps(planner: &Planner) -> Vec<PlanStep> {
    vec![
        PlanStep::shell("Start sync banner", "echo Starting patient record sync"),
        PlanStep::http("Fetch API health", "GET", &planner.health_url),
        PlanStep::git("Check repo status", ["status"]),
        PlanStep::shell("Finalize sync", "echo Sync finalized"),
        PlanStep::http(
            "Validation: confirm sync outcomes via health endpoint",
            "GET",
            &planner.health_url,
        ),
    ]
}

/// Plan generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planner {
    pub health_url: String,
}

impl Default for Planner {
    fn default() -> Self {
        Self {
            health_url: DEFAULT_HEALTH_URL.to_string(),
        }
    }
}

impl Planner {
    pub fn new(health_url: impl Into<String>) -> Self {
        Self {
            health_url: health_url.into(),
        }
    }

    /// Build the plan for a task in a domain.
    pub fn generate(&self, task: &Task, domain: Domain) -> TaskPlan {
        let compliance = catalog::requirements(domain);
        let lowered = task.text.to_lowercase();
        if let Some(intent) = INTENTS
            .iter()
            .find(|intent| intent.triggers.iter().any(|t| lowered.contains(t)))
        {
            return TaskPlan {
                title: intent.title.to_string(),
                steps: (intent.build)(self),
                compliance,
            };
        }

        TaskPlan {
            title: format!("{} Delivery", title_case(domain.as_str())),
            steps: narrative_steps(domain),
            compliance,
        }
    }
}

/// Generate a plan with default planner settings.
pub fn generate(task: &Task, domain: Domain) -> TaskPlan {
    Planner::default().generate(task, domain)
}

fn narrative_steps(domain: Domain) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    for phase in Phase::ALL {
        steps.push(PlanStep::narrative(format!(
            "{}: {}",
            phase.name(),
            phase.baseline()
        )));
        for (_, _, text) in INJECTIONS
            .iter()
            .filter(|(d, p, _)| *d == domain && *p == phase)
        {
            steps.push(PlanStep::narrative(format!("{}: {}", phase.name(), text)));
        }
    }
    steps
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
