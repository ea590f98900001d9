use crate::engine::{aligner::Alignment, engine_model::MatchedNode};
use crate::index::candidate_index::CandidateIndex;
use crate::scenario::scenario_model::{
    ExecutableAction, OutcomeStatus, ScenarioRecord, StepOutcome,
};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_PARTIAL: &str = "partial";
/// Action type written for a matched action the index no longer holds.
pub const UNKNOWN_ACTION_TYPE: &str = "unknown";

/// Replayable actions for a matched path. Scene nodes and unmatched steps
/// produce nothing.
pub fn executable_actions(path: &[MatchedNode], index: &CandidateIndex) -> Vec<ExecutableAction> {
    path.iter()
        .filter_map(|node| match node {
            MatchedNode::Action {
                identity,
                name,
                description,
                bounds,
                ..
            } => {
                let recorded = index.action(identity);
                let action_type = recorded
                    .map(|a| a.interaction.as_str())
                    .unwrap_or(UNKNOWN_ACTION_TYPE);
                Some(ExecutableAction {
                    action_type: action_type.to_string(),
                    action_name: name.clone(),
                    action_description: Some(description.clone()),
                    bounds: bounds.or(recorded.map(|a| a.bounds)),
                    input_text: None,
                })
            }
            MatchedNode::LiteralInput { text } => Some(ExecutableAction {
                action_type: "input".to_string(),
                action_name: "input".to_string(),
                action_description: None,
                bounds: None,
                input_text: Some(text.clone()),
            }),
            MatchedNode::Scene { .. } | MatchedNode::NoMatch => None,
        })
        .collect()
}

pub fn step_outcomes(alignment: &Alignment) -> Vec<StepOutcome> {
    alignment
        .steps
        .iter()
        .zip(&alignment.path)
        .enumerate()
        .map(|(i, (step, node))| StepOutcome {
            step: i,
            target: step.text.clone(),
            status: match node {
                MatchedNode::Scene { .. } | MatchedNode::Action { .. } => OutcomeStatus::Matched,
                MatchedNode::LiteralInput { .. } => OutcomeStatus::LiteralInput,
                MatchedNode::NoMatch => OutcomeStatus::NoMatch,
            },
            identity: node.identity().cloned(),
        })
        .collect()
}

/// Write the alignment result into the scenario record.
pub fn apply_alignment(record: &mut ScenarioRecord, alignment: &Alignment, index: &CandidateIndex) {
    let status = if alignment.fully_matched() {
        STATUS_SUCCESS
    } else {
        STATUS_PARTIAL
    };
    record.note = Some(status.to_string());
    record.code = executable_actions(&alignment.path, index);
    record.outcomes = step_outcomes(alignment);
}
