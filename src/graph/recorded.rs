use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::graph_query::{ActionDetail, ArrivalScene, GraphQuery, SceneDetail};
use crate::index::{
    identity::{NodeId, action_identity},
    record::InteractionEvent,
};

/// In-memory scene/action graph built from recorded events.
///
/// Edges follow `Scene --LEADS_TO--> Action --LEADS_TO--> Scene`. An action
/// keeps the first arrival scene it was recorded with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedGraph {
    /// Scenes keyed by identity
    pub scenes: IndexMap<NodeId, SceneDetail>,

    /// Actions keyed by identity
    pub actions: IndexMap<NodeId, ActionDetail>,

    /// Outgoing actions per scene, in recording order, no duplicates
    pub outgoing: HashMap<NodeId, Vec<NodeId>>,

    /// Arrival scene per action
    pub arrival: HashMap<NodeId, NodeId>,
}

impl RecordedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a InteractionEvent>) -> Self {
        let mut graph = Self::new();
        for event in events {
            graph.add_event(event);
        }
        graph
    }

    pub fn add_event(&mut self, event: &InteractionEvent) {
        let sem = &event.gpt_out;
        let start = NodeId::new(event.start_state.clone());
        let stop = NodeId::new(event.stop_state.clone());
        let action = action_identity(&event.event.view.view_str);

        self.add_scene(
            start.clone(),
            SceneDetail {
                name: sem.previous_page_name.clone(),
                description: sem.previous_page_description.clone(),
            },
        );
        self.add_scene(
            stop.clone(),
            SceneDetail {
                name: sem.current_page_name.clone(),
                description: sem.current_page_description.clone(),
            },
        );
        self.add_action(
            action.clone(),
            ActionDetail {
                name: sem.action_name.clone(),
                description: sem.action_description.clone(),
                bounds: Some(event.event.view.bounds),
                resource_id: event.event.view.resource_id.clone(),
            },
        );
        self.add_transition(&start, &action, &stop);
    }

    /// Add a scene. An existing scene keeps its position but takes the new detail.
    pub fn add_scene(&mut self, id: NodeId, detail: SceneDetail) {
        self.scenes.insert(id, detail);
    }

    pub fn add_action(&mut self, id: NodeId, detail: ActionDetail) {
        self.actions.insert(id, detail);
    }

    /// Record `from --action--> to`.
    pub fn add_transition(&mut self, from: &NodeId, action: &NodeId, to: &NodeId) {
        let out = self.outgoing.entry(from.clone()).or_default();
        if !out.contains(action) {
            out.push(action.clone());
        }
        self.arrival
            .entry(action.clone())
            .or_insert_with(|| to.clone());
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(Vec::len).sum::<usize>() + self.arrival.len()
    }
}

impl GraphQuery for RecordedGraph {
    fn details_for_scenes(&self, ids: &[NodeId]) -> HashMap<NodeId, SceneDetail> {
        ids.iter()
            .filter_map(|id| self.scenes.get(id).map(|d| (id.clone(), d.clone())))
            .collect()
    }

    fn details_for_actions(&self, ids: &[NodeId]) -> HashMap<NodeId, ActionDetail> {
        ids.iter()
            .filter_map(|id| self.actions.get(id).map(|d| (id.clone(), d.clone())))
            .collect()
    }

    fn outgoing_actions(&self, scene: &NodeId) -> Vec<NodeId> {
        self.outgoing.get(scene).cloned().unwrap_or_default()
    }

    fn arrival_scene(&self, action: &NodeId) -> Option<ArrivalScene> {
        let scene = self.arrival.get(action)?;
        let detail = self.scenes.get(scene)?;
        Some(ArrivalScene {
            identity: scene.clone(),
            name: detail.name.clone(),
            description: detail.description.clone(),
        })
    }
}
