//! Plan shape checks for plans loaded from outside the generator.

use crate::core::types::{StepCommand, TaskPlan};

/// Check plan invariants:
/// - Title is non-empty
/// - Every step has a description
/// - Shell commands, git args and http urls are non-empty
/// - HTTP methods are plain ASCII tokens
pub fn validate_plan(plan: &TaskPlan) -> Vec<String> {
    let mut errors = Vec::new();
    if plan.title.trim().is_empty() {
        errors.push("plan title must not be empty".to_string());
    }

    for (index, step) in plan.steps.iter().enumerate() {
        if step.description.trim().is_empty() {
            errors.push(format!("step {index}: description must not be empty"));
        }
        match &step.command {
            Some(StepCommand::Shell { command }) if command.trim().is_empty() => {
                errors.push(format!("step {index}: shell command must not be empty"));
            }
            Some(StepCommand::Git { args }) if args.is_empty() => {
                errors.push(format!("step {index}: git args must not be empty"));
            }
            Some(StepCommand::Http { method, url, .. }) => {
                if url.trim().is_empty() {
                    errors.push(format!("step {index}: http url must not be empty"));
                }
                if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
                    errors.push(format!("step {index}: invalid http method '{method}'"));
                }
            }
            _ => {}
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::generate;
    use crate::core::types::{Domain, PlanStep, Task};

    #[test]
    fn generated_plans_satisfy_invariants() {
        let plan = generate(&Task::new("sync patient records"), Domain::Healthcare);
        assert!(validate_plan(&plan).is_empty());
        let plan = generate(&Task::new("improve team morale"), Domain::General);
        assert!(validate_plan(&plan).is_empty());
    }

    #[test]
    fn reports_every_violation() {
        let plan = TaskPlan {
            title: " ".to_string(),
            steps: vec![
                PlanStep::shell("empty", ""),
                PlanStep::git("no args", Vec::<String>::new()),
                PlanStep::http("bad", "GE T", ""),
            ],
            compliance: Vec::new(),
        };
        let errors = validate_plan(&plan);
        assert!(errors.iter().any(|e| e.contains("title")));
        assert!(errors.iter().any(|e| e.contains("step 0: shell command")));
        assert!(errors.iter().any(|e| e.contains("step 1: git args")));
        assert!(errors.iter().any(|e| e.contains("step 2: http url")));
        assert!(errors.iter().any(|e| e.contains("invalid http method")));
    }
}
