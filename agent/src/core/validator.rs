//! Validation gate: decides whether an executed plan ran correctly enough to be
//! declared validated.

use crate::core::types::{ExecutionResult, ResultMeta, StepStatus, TaskPlan};

/// Return true iff the results validate the plan.
///
/// - No results, or fewer results than plan steps (halted run): fail.
/// - Every executable result must be exactly `ok`.
/// - HTTP results carrying a status code must be strict 2xx.
/// - At least one executable result must exist; an all-narrative run is not validated.
pub fn validate(plan: &TaskPlan, results: &[ExecutionResult]) -> bool {
    if results.is_empty() || results.len() < plan.steps.len() {
        return false;
    }

    let mut executable = 0usize;
    for result in results {
        let Some(kind) = result.command else {
            continue;
        };
        if !kind.is_executable() {
            continue;
        }
        executable += 1;
        if result.status != StepStatus::Ok {
            return false;
        }
        if let Some(ResultMeta::Http { status_code }) = result.meta
            && !(200..300).contains(&status_code)
        {
            return false;
        }
    }
    executable > 0
}
