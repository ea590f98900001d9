use serde::Serialize;

/// How many times a step has already sent the cursor backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackState {
    #[default]
    Fresh,
    Once,
    Twice,
}

impl RollbackState {
    pub fn count(&self) -> u8 {
        match self {
            RollbackState::Fresh => 0,
            RollbackState::Once => 1,
            RollbackState::Twice => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackMove {
    /// Pop `steps` matched nodes, move the cursor back as far, and mark the
    /// failing step with `next`.
    Back { steps: usize, next: RollbackState },
    /// Record `NoMatch` for the failing step and move on.
    GiveUp,
}

/// Decide what a failed action step at `cursor` does next.
///
/// First failure goes back one step, second failure goes back two; after
/// that, or when there is not enough history to go back that far, the step
/// is given up on.
pub fn plan_rollback(state: RollbackState, cursor: usize) -> RollbackMove {
    match state {
        RollbackState::Fresh if cursor > 0 => RollbackMove::Back {
            steps: 1,
            next: RollbackState::Once,
        },
        RollbackState::Once if cursor > 1 => RollbackMove::Back {
            steps: 2,
            next: RollbackState::Twice,
        },
        _ => RollbackMove::GiveUp,
    }
}
