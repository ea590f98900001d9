use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::engine_model::{AlignmentPlan, TargetStep};
use crate::error::LoadError;
use crate::index::{identity::NodeId, record::Bounds};

/// File holding one scenario inside its case directory.
pub const SCENARIO_FILE: &str = "flow_path.json";

/// A scenario as authored, plus the results written back after alignment.
/// Unknown fields survive a load/save round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioRecord {
    /// Where the scenario starts; blank means the app's main page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_conditions: Option<String>,

    pub steps: Vec<ScenarioStep>,

    /// Status marker: `success` or `partial`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Executable actions, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code: Vec<ExecutableAction>,

    /// One outcome per aligned step, unmatched ones included
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<StepOutcome>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioStep {
    /// Human description of the step
    #[serde(rename = "action_des", alias = "description")]
    pub description: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One generated, replayable action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutableAction {
    pub action_type: String,
    pub action_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Matched,
    LiteralInput,
    NoMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepOutcome {
    pub step: usize,
    pub target: String,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<NodeId>,
}

impl ScenarioRecord {
    pub fn new(pre_conditions: Option<&str>, steps: &[&str]) -> Self {
        Self {
            pre_conditions: pre_conditions.map(str::to_string),
            steps: steps
                .iter()
                .map(|s| ScenarioStep {
                    description: s.to_string(),
                    extra: Map::new(),
                })
                .collect(),
            note: None,
            code: Vec::new(),
            outcomes: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Opening scene target: the pre-condition, or `default_scene` when blank.
    pub fn opening_scene<'s>(&'s self, default_scene: &'s str) -> &'s str {
        match self.pre_conditions.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => default_scene,
        }
    }

    /// Target steps: one scene step followed by one action step per
    /// authored step.
    pub fn target_steps(&self, default_scene: &str) -> Vec<TargetStep> {
        std::iter::once(TargetStep::scene(self.opening_scene(default_scene)))
            .chain(self.steps.iter().map(|s| TargetStep::action(s.description.trim())))
            .collect()
    }

    pub fn plan(&self, name: &str, default_scene: &str) -> AlignmentPlan {
        AlignmentPlan::new(name, self.target_steps(default_scene))
    }
}

pub fn load_scenario(path: &Path) -> Result<ScenarioRecord, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| LoadError::json(path, e))
}

pub fn save_scenario(path: &Path, record: &ScenarioRecord) -> Result<(), LoadError> {
    let json = serde_json::to_string_pretty(record).map_err(|e| LoadError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| LoadError::io(path, e))
}
