//! Rollback suggestion shown when a task fails validation.
//!
//! The suggestion is a static template for the operator to adapt. The pipeline
//! never reverts side effects itself.

use crate::core::types::Environment;

/// Suggest a rollback command, or `None` when the task validated.
pub fn suggest_rollback(
    validation_ok: bool,
    ticket_id: &str,
    environment: Environment,
) -> Option<String> {
    if validation_ok {
        return None;
    }
    Some(format!(
        "git revert --no-edit <commit-sha>  # ticket {ticket_id}: \
         revert the change in {}, then re-run validation",
        environment.as_str()
    ))
}
