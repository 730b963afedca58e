//! Apply state machine.
//!
//! ```text
//! Idle → AttemptingRuntime → Succeeded
//!                          → AttemptingFilePatch → Succeeded
//!                                                → Failed
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyState {
    Idle,
    AttemptingRuntime,
    AttemptingFilePatch,
    Succeeded,
    Failed,
}

impl ApplyState {
    pub fn can_transition_to(self, next: ApplyState) -> bool {
        use ApplyState::*;
        matches!(
            (self, next),
            (Idle, AttemptingRuntime)
                | (AttemptingRuntime, Succeeded)
                | (AttemptingRuntime, AttemptingFilePatch)
                | (AttemptingFilePatch, Succeeded)
                | (AttemptingFilePatch, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ApplyState::Succeeded | ApplyState::Failed)
    }
}

impl fmt::Display for ApplyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplyState::Idle => "idle",
            ApplyState::AttemptingRuntime => "attempting_runtime",
            ApplyState::AttemptingFilePatch => "attempting_file_patch",
            ApplyState::Succeeded => "succeeded",
            ApplyState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Current state of one `apply` call; every transition is traced.
#[derive(Debug)]
pub(crate) struct StateTracker {
    state: ApplyState,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: ApplyState::Idle,
        }
    }

    pub(crate) fn enter(&mut self, next: ApplyState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal apply transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(from = %self.state, to = %next, "Apply state transition");
        self.state = next;
    }

    pub(crate) fn state(&self) -> ApplyState {
        self.state
    }
}
