use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    engine::{engine_model::StepKind, rollback::RollbackState},
    index::identity::NodeId,
};

/// What happened at one engine transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Selected,
    LiteralInput,
    /// Scene step accepted its best-ranked candidate without an explicit pick
    Fallback,
    RolledBack,
    NoMatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlignmentEvent {
    pub timestamp_ms: u128,
    pub scenario: String,

    /// Step being evaluated
    pub step: usize,
    pub kind: StepKind,
    pub target: String,

    pub outcome: Outcome,
    pub identity: Option<NodeId>,
    pub candidates: usize,
    pub rollback: RollbackState,

    /// Cursor after the transition
    pub cursor: usize,
}

impl AlignmentEvent {
    pub fn now(scenario: &str, step: usize, kind: StepKind, target: &str, outcome: Outcome) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            scenario: scenario.to_string(),
            step,
            kind,
            target: target.to_string(),
            outcome,
            identity: None,
            candidates: 0,
            rollback: RollbackState::Fresh,
            cursor: step,
        }
    }

    pub fn with_identity(mut self, identity: Option<&NodeId>) -> Self {
        self.identity = identity.cloned();
        self
    }

    pub fn with_candidates(mut self, count: usize) -> Self {
        self.candidates = count;
        self
    }

    pub fn with_rollback(mut self, rollback: RollbackState) -> Self {
        self.rollback = rollback;
        self
    }

    pub fn with_cursor(mut self, cursor: usize) -> Self {
        self.cursor = cursor;
        self
    }
}
