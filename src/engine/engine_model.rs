use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::engine::rollback::RollbackState;
use crate::graph::graph_query::ArrivalScene;
use crate::index::{identity::NodeId, record::Bounds};
use crate::rank::similarity::{ACTION_TOP_K, SCENE_TOP_K};

/// Target text of the opening scene step when a scenario has no pre-condition.
pub const DEFAULT_SCENE: &str = "main page";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Scene,
    Action,
}

/// One step of the scenario, plus the per-step search state the engine
/// keeps while aligning it.
#[derive(Debug, Clone)]
pub struct TargetStep {
    pub kind: StepKind,
    pub text: String,
    pub rollback: RollbackState,
    /// Candidates already chosen for this step; never offered again
    pub rejected: HashSet<NodeId>,
}

impl TargetStep {
    pub fn scene(text: impl Into<String>) -> Self {
        Self::new(StepKind::Scene, text)
    }

    pub fn action(text: impl Into<String>) -> Self {
        Self::new(StepKind::Action, text)
    }

    fn new(kind: StepKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            rollback: RollbackState::Fresh,
            rejected: HashSet::new(),
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchedNode {
    Scene {
        identity: NodeId,
        name: String,
        description: String,
    },
    Action {
        identity: NodeId,
        name: String,
        description: String,
        bounds: Option<Bounds>,
        resource_id: Option<String>,
        arrival: ArrivalScene,
    },
    LiteralInput {
        text: String,
    },
    NoMatch,
}

impl MatchedNode {
    /// Graph identity of the chosen node, if any.
    pub fn identity(&self) -> Option<&NodeId> {
        match self {
            MatchedNode::Scene { identity, .. } | MatchedNode::Action { identity, .. } => {
                Some(identity)
            }
            _ => None,
        }
    }

    /// Scene the path is in after this node: the scene itself, or where the
    /// action leads.
    pub fn current_scene(&self) -> Option<&NodeId> {
        match self {
            MatchedNode::Scene { identity, .. } => Some(identity),
            MatchedNode::Action { arrival, .. } => Some(&arrival.identity),
            _ => None,
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, MatchedNode::NoMatch)
    }
}

/// Tunables for one alignment run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignConfig {
    #[serde(default = "default_scene_top_k")]
    pub scene_top_k: usize,

    #[serde(default = "default_action_top_k")]
    pub action_top_k: usize,

    #[serde(default = "default_scene")]
    pub default_scene: String,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            scene_top_k: SCENE_TOP_K,
            action_top_k: ACTION_TOP_K,
            default_scene: DEFAULT_SCENE.to_string(),
        }
    }
}

fn default_scene_top_k() -> usize { SCENE_TOP_K }
fn default_action_top_k() -> usize { ACTION_TOP_K }
fn default_scene() -> String { DEFAULT_SCENE.to_string() }

/// Ordered target steps of one scenario plus the scenario as a single line
/// of context for the arbiter.
#[derive(Debug, Clone)]
pub struct AlignmentPlan {
    pub name: String,
    pub steps: Vec<TargetStep>,
    pub context: String,
}

impl AlignmentPlan {
    pub fn new(name: impl Into<String>, steps: Vec<TargetStep>) -> Self {
        let context = steps
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name: name.into(),
            steps,
            context,
        }
    }
}
