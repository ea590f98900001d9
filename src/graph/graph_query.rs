use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::index::{identity::NodeId, record::Bounds};

/// Graph-stored detail of a scene node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDetail {
    pub name: String,
    pub description: String,
}

/// Graph-stored detail of an action node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDetail {
    pub name: String,
    pub description: String,
    pub bounds: Option<Bounds>,
    pub resource_id: Option<String>,
}

/// The scene an action leads to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalScene {
    pub identity: NodeId,
    pub name: String,
    pub description: String,
}

/// Path-constrained lookups against the recorded scene/action graph.
///
/// Lookups never fail: an unreachable backend or an unknown identity yields
/// an empty map, an empty list or `None`, and callers treat a missing detail
/// as "candidate not usable".
pub trait GraphQuery {
    fn details_for_scenes(&self, ids: &[NodeId]) -> HashMap<NodeId, SceneDetail>;

    fn details_for_actions(&self, ids: &[NodeId]) -> HashMap<NodeId, ActionDetail>;

    fn outgoing_actions(&self, scene: &NodeId) -> Vec<NodeId>;

    fn arrival_scene(&self, action: &NodeId) -> Option<ArrivalScene>;
}
