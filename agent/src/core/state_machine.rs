//! Deployment state holder for one pipeline invocation.
//!
//! The machine makes no decisions: the pipeline drives every transition with
//! [`DeploymentStateMachine::set_state`]. Transitions are recorded in order and
//! surface as `TaskReport::state_history`; the manifest keeps only the final state.

use crate::core::types::DeploymentState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentStateMachine {
    current: DeploymentState,
    history: Vec<DeploymentState>,
}

impl DeploymentStateMachine {
    /// Fresh machine at `Idle`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DeploymentState {
        self.current
    }

    /// Unconditionally move to `next`.
    pub fn set_state(&mut self, next: DeploymentState) {
        tracing::debug!(from = self.current.as_str(), to = next.as_str(), "state transition");
        self.history.push(self.current);
        self.current = next;
    }

    /// States visited before the current one, oldest first.
    pub fn history(&self) -> &[DeploymentState] {
        &self.history
    }
}
