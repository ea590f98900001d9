use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::arbiter::decision::Decision;
use crate::embedding::embedder::tokenize;
use crate::engine::engine_model::StepKind;
use crate::error::ServiceError;
use crate::graph::graph_query::ArrivalScene;
use crate::index::{identity::NodeId, record::Bounds};

// ============================================================================
// Candidates as presented to the arbiter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateDetail {
    Scene {
        name: String,
        description: String,
    },
    Action {
        name: String,
        description: String,
        bounds: Option<Bounds>,
        resource_id: Option<String>,
        arrival: ArrivalScene,
    },
}

/// A ranked, graph-enriched candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub identity: NodeId,
    pub score: f32,
    pub detail: CandidateDetail,
}

impl Candidate {
    pub fn name(&self) -> &str {
        match &self.detail {
            CandidateDetail::Scene { name, .. } | CandidateDetail::Action { name, .. } => name,
        }
    }

    /// One prompt line; `position` is the 1-based index the arbiter answers with.
    pub fn describe(&self, position: usize) -> String {
        match &self.detail {
            CandidateDetail::Scene { name, description } => format!(
                "index of scene candidate: {}, similarity: {:.4}, scene name: {}, scene description: {}",
                position, self.score, name, description
            ),
            CandidateDetail::Action {
                name,
                description,
                arrival,
                ..
            } => format!(
                "index of action candidate: {}, similarity: {:.4}, action name: {}, action description: {}, arrival scene name: {}, arrival scene description: {}",
                position, self.score, name, description, arrival.name, arrival.description
            ),
        }
    }
}

/// Everything the arbiter sees for one step.
#[derive(Debug, Clone)]
pub struct ArbiterRequest<'a> {
    pub kind: StepKind,
    pub target: &'a str,
    pub candidates: &'a [Candidate],
    /// The whole scenario as one line of text
    pub context: &'a str,
}

impl ArbiterRequest<'_> {
    /// Candidate list in presentation order, 1-based.
    pub fn formatted_candidates(&self) -> Vec<String> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, c)| c.describe(i + 1))
            .collect()
    }
}

/// External semantic decision service.
pub trait Arbiter {
    fn choose(&self, request: &ArbiterRequest<'_>) -> Result<Decision, ServiceError>;
}

// ============================================================================
// LexicalArbiter: offline word-overlap decisions
// ============================================================================

const STOPWORDS: &[&str] = &["a", "an", "the", "to", "of", "on", "in", "and", "page", "button"];

/// Picks the candidate whose name shares the most words with the target.
///
/// Targets like `input "hello"` or `type 'hello'` become literal input when
/// the step is an action. No shared words means no match.
pub struct LexicalArbiter;

impl LexicalArbiter {
    fn words(text: &str) -> HashSet<String> {
        tokenize(text)
            .into_iter()
            .filter(|w| !STOPWORDS.contains(&w.as_str()))
            .collect()
    }
}

/// Quoted text after an `input`/`type`/`enter` verb.
pub fn literal_input_text(target: &str) -> Option<String> {
    let lower = target.trim_start().to_lowercase();
    if !["input", "type", "enter"].iter().any(|v| lower.starts_with(v)) {
        return None;
    }
    let open = target.find(['"', '\''])?;
    let quote = target[open..].chars().next()?;
    let rest = &target[open + 1..];
    let close = rest.find(quote)?;
    Some(rest[..close].to_string())
}

impl Arbiter for LexicalArbiter {
    fn choose(&self, request: &ArbiterRequest<'_>) -> Result<Decision, ServiceError> {
        if request.kind == StepKind::Action {
            if let Some(text) = literal_input_text(request.target) {
                return Ok(Decision::literal(text));
            }
        }

        let target = Self::words(request.target);
        let mut best: Option<(usize, usize)> = None;
        for (i, candidate) in request.candidates.iter().enumerate() {
            let overlap = Self::words(candidate.name()).intersection(&target).count();
            if overlap > 0 && best.is_none_or(|(_, b)| overlap > b) {
                best = Some((i, overlap));
            }
        }

        Ok(match best {
            Some((i, _)) => Decision::selected(i + 1),
            None => Decision::NoMatch,
        })
    }
}

// ============================================================================
// ScriptedArbiter: canned decisions (tests)
// ============================================================================

/// What a scripted arbiter saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub kind: StepKind,
    pub target: String,
    pub candidates: Vec<NodeId>,
}

/// Replays queued answers in order; `None` in the queue simulates an
/// exhausted service. Once the queue is empty every call gets `fallback`.
pub struct ScriptedArbiter {
    script: RefCell<VecDeque<Option<Decision>>>,
    fallback: Decision,
    seen: RefCell<Vec<SeenRequest>>,
}

impl ScriptedArbiter {
    pub fn new(script: impl IntoIterator<Item = Option<Decision>>) -> Self {
        Self {
            script: RefCell::new(script.into_iter().collect()),
            fallback: Decision::selected(1),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: Decision) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.borrow().clone()
    }
}

impl Arbiter for ScriptedArbiter {
    fn choose(&self, request: &ArbiterRequest<'_>) -> Result<Decision, ServiceError> {
        self.seen.borrow_mut().push(SeenRequest {
            kind: request.kind,
            target: request.target.to_string(),
            candidates: request.candidates.iter().map(|c| c.identity.clone()).collect(),
        });

        match self.script.borrow_mut().pop_front() {
            Some(Some(decision)) => Ok(decision),
            Some(None) => Err(ServiceError::Exhausted {
                attempts: 1,
                last: Box::new(ServiceError::NoDecision("scripted failure".into())),
            }),
            None => Ok(self.fallback.clone()),
        }
    }
}
