use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::embedding::embedder::Embedder;
use crate::error::ServiceError;
use crate::index::{
    identity::{NodeId, action_identity},
    record::{Bounds, InteractionEvent, InteractionType},
};

// ============================================================================
// Node model
// ============================================================================

/// A recorded, deduplicated UI state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub description: String,
    pub embedding: Vec<f32>,
}

/// A recorded, deduplicated interaction on a UI element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionNode {
    pub name: String,
    pub description: String,
    pub bounds: Bounds,
    pub interaction: InteractionType,
    pub embedding: Vec<f32>,
}

/// One entry of a candidate pool: identity and vector travel together so
/// ranking never has to re-find a node from its embedding.
#[derive(Debug, Clone, Copy)]
pub struct PoolEntry<'a> {
    pub identity: &'a NodeId,
    pub vector: &'a [f32],
}

// ============================================================================
// CandidateIndex
// ============================================================================

/// Scene and action nodes keyed by identity, in first-seen order.
///
/// Built once and then only read, so a single index can back any number of
/// alignment runs by shared reference.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    scenes: IndexMap<NodeId, SceneNode>,
    actions: IndexMap<NodeId, ActionNode>,
}

impl CandidateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from recorded events. Each event contributes its two scenes
    /// and its action; later observations overwrite attributes but keep
    /// the first-seen position.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a InteractionEvent>) -> Self {
        let mut index = Self::new();
        for event in events {
            index.add_event(event);
        }
        index
    }

    pub fn add_event(&mut self, event: &InteractionEvent) {
        let sem = &event.gpt_out;
        let emb = &event.embedding;

        self.insert_scene(
            NodeId::new(event.start_state.clone()),
            SceneNode {
                name: sem.previous_page_name.clone(),
                description: sem.previous_page_description.clone(),
                embedding: emb.previous_page_name_embedding.clone(),
            },
        );
        self.insert_scene(
            NodeId::new(event.stop_state.clone()),
            SceneNode {
                name: sem.current_page_name.clone(),
                description: sem.current_page_description.clone(),
                embedding: emb.current_page_name_embedding.clone(),
            },
        );
        self.insert_action(
            action_identity(&event.event.view.view_str),
            ActionNode {
                name: sem.action_name.clone(),
                description: sem.action_description.clone(),
                bounds: event.event.view.bounds,
                interaction: event.event.event_type.clone(),
                embedding: emb.action_name_embedding.clone(),
            },
        );
    }

    /// Replace every stored vector with `embedder`'s embedding of the node
    /// name, so pools share the embedder's space with query texts.
    pub fn reembed(&mut self, embedder: &dyn Embedder) -> Result<(), ServiceError> {
        let scene_names: Vec<&str> = self.scenes.values().map(|n| n.name.as_str()).collect();
        let scene_vectors = embedder.embed(&scene_names)?;
        let action_names: Vec<&str> = self.actions.values().map(|n| n.name.as_str()).collect();
        let action_vectors = embedder.embed(&action_names)?;

        if scene_vectors.len() != self.scenes.len() || action_vectors.len() != self.actions.len() {
            return Err(ServiceError::Shape(format!(
                "expected {} scene and {} action vectors, got {} and {}",
                self.scenes.len(),
                self.actions.len(),
                scene_vectors.len(),
                action_vectors.len()
            )));
        }

        for (node, vector) in self.scenes.values_mut().zip(scene_vectors) {
            node.embedding = vector;
        }
        for (node, vector) in self.actions.values_mut().zip(action_vectors) {
            node.embedding = vector;
        }
        tracing::debug!(
            scenes = self.scenes.len(),
            actions = self.actions.len(),
            "re-embedded index"
        );
        Ok(())
    }

    pub fn insert_scene(&mut self, id: NodeId, node: SceneNode) {
        self.scenes.insert(id, node);
    }

    pub fn insert_action(&mut self, id: NodeId, node: ActionNode) {
        self.actions.insert(id, node);
    }

    pub fn scene(&self, id: &NodeId) -> Option<&SceneNode> {
        self.scenes.get(id)
    }

    pub fn action(&self, id: &NodeId) -> Option<&ActionNode> {
        self.actions.get(id)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Every scene, in insertion order.
    pub fn all_scene_candidates(&self) -> Vec<PoolEntry<'_>> {
        self.scenes
            .iter()
            .map(|(id, node)| PoolEntry {
                identity: id,
                vector: &node.embedding,
            })
            .collect()
    }

    /// Actions restricted to `restrict_to`, falling back to the full pool
    /// when the restriction is empty or names nothing the index knows.
    pub fn action_candidates(&self, restrict_to: &HashSet<NodeId>) -> Vec<PoolEntry<'_>> {
        let all = self.actions.iter().map(|(id, node)| PoolEntry {
            identity: id,
            vector: &node.embedding,
        });

        if restrict_to.is_empty() {
            return all.collect();
        }

        let restricted: Vec<_> = all
            .clone()
            .filter(|entry| restrict_to.contains(entry.identity))
            .collect();

        if restricted.is_empty() {
            tracing::debug!(
                requested = restrict_to.len(),
                "outgoing actions missing from index, using full action pool"
            );
            return all.collect();
        }
        restricted
    }
}
