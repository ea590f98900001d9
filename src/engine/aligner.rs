use std::collections::HashSet;

use tracing::{debug, info, info_span, warn};

use crate::{
    arbiter::{
        arbiter::{Arbiter, ArbiterRequest, Candidate, CandidateDetail},
        decision::Decision,
    },
    embedding::embedder::Embedder,
    engine::{
        engine_model::{AlignConfig, AlignmentPlan, MatchedNode, StepKind, TargetStep},
        rollback::{RollbackMove, plan_rollback},
    },
    graph::graph_query::GraphQuery,
    index::{
        candidate_index::{CandidateIndex, PoolEntry},
        identity::NodeId,
    },
    rank::similarity::{Ranked, SimilarityRanker},
    trace::{
        logger::TraceLogger,
        trace::{AlignmentEvent, Outcome},
    },
};

// ============================================================================
// Per-run state
// ============================================================================

/// Mutable state of one alignment: the cursor, the matched path and the
/// per-step rollback bookkeeping. Owned by exactly one run.
#[derive(Debug)]
pub struct AlignmentRun {
    name: String,
    context: String,
    steps: Vec<TargetStep>,
    cursor: usize,
    path: Vec<MatchedNode>,
    events: Vec<AlignmentEvent>,
}

impl AlignmentRun {
    pub fn new(plan: AlignmentPlan) -> Self {
        Self {
            name: plan.name,
            context: plan.context,
            steps: plan.steps,
            cursor: 0,
            path: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn path(&self) -> &[MatchedNode] {
        &self.path
    }

    pub fn steps(&self) -> &[TargetStep] {
        &self.steps
    }

    pub fn is_done(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Scene the path currently stands in, from the last matched node.
    pub fn current_scene(&self) -> Option<&NodeId> {
        self.path.last()?.current_scene()
    }

    fn advance(&mut self, node: MatchedNode) {
        debug_assert_eq!(self.path.len(), self.cursor);
        self.path.push(node);
        self.cursor += 1;
    }

    /// Pop `steps` nodes and move the cursor back by the same amount.
    fn retreat(&mut self, steps: usize) {
        debug_assert!(steps <= self.cursor);
        self.path.truncate(self.cursor - steps);
        self.cursor -= steps;
    }

    fn finish(self) -> Alignment {
        Alignment {
            scenario: self.name,
            steps: self.steps,
            path: self.path,
            events: self.events,
        }
    }
}

/// Result of aligning one scenario: exactly one matched node per step.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub scenario: String,
    pub steps: Vec<TargetStep>,
    pub path: Vec<MatchedNode>,
    pub events: Vec<AlignmentEvent>,
}

impl Alignment {
    pub fn rollbacks(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.outcome == Outcome::RolledBack)
            .count()
    }

    pub fn unmatched(&self) -> usize {
        self.path.iter().filter(|n| n.is_no_match()).count()
    }

    pub fn fully_matched(&self) -> bool {
        self.unmatched() == 0
    }
}

// ============================================================================
// Aligner
// ============================================================================

enum Pick<'c> {
    Chosen(&'c Candidate),
    Literal(String),
    Nothing,
}

/// Walks a scenario step by step, matching each step to a graph node.
pub struct Aligner<'a> {
    index: &'a CandidateIndex,
    ranker: SimilarityRanker<'a>,
    graph: &'a dyn GraphQuery,
    arbiter: &'a dyn Arbiter,
    config: AlignConfig,
    tracer: Option<&'a TraceLogger>,
}

impl<'a> Aligner<'a> {
    pub fn new(
        index: &'a CandidateIndex,
        embedder: &'a dyn Embedder,
        graph: &'a dyn GraphQuery,
        arbiter: &'a dyn Arbiter,
    ) -> Self {
        Self {
            index,
            ranker: SimilarityRanker::new(embedder),
            graph,
            arbiter,
            config: AlignConfig::default(),
            tracer: None,
        }
    }

    pub fn with_config(mut self, config: AlignConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tracer(mut self, tracer: &'a TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    /// Align every step of `plan`. Always terminates with one node per step.
    pub fn align(&self, plan: AlignmentPlan) -> Alignment {
        let _span = info_span!("align", scenario = %plan.name).entered();
        let mut run = AlignmentRun::new(plan);

        while !run.is_done() {
            self.step(&mut run);
        }

        let alignment = run.finish();
        info!(
            steps = alignment.path.len(),
            unmatched = alignment.unmatched(),
            rollbacks = alignment.rollbacks(),
            "alignment finished"
        );
        alignment
    }

    /// Evaluate the step under the cursor once. A finished run is left
    /// untouched.
    pub fn step(&self, run: &mut AlignmentRun) {
        if run.is_done() {
            return;
        }
        match run.steps[run.cursor].kind {
            StepKind::Scene => self.match_scene(run),
            StepKind::Action => self.match_action(run),
        }
    }

    // ---- Scene steps ----

    fn match_scene(&self, run: &mut AlignmentRun) {
        let at = run.cursor;
        let target = run.steps[at].text.clone();
        info!(step = at, total = run.steps.len(), "matching scene '{}'", target);

        let pool = self.index.all_scene_candidates();
        let ranked = self.rank(&target, &pool, self.config.scene_top_k);
        let candidates = self.enrich_scenes(ranked);

        let decision = self.ask(StepKind::Scene, &target, &candidates, &run.context);

        // Scene steps never roll back: anything short of a pick takes the
        // best-ranked candidate.
        let (chosen, outcome) = match pick(decision, &candidates) {
            Pick::Chosen(c) => (Some(c), Outcome::Selected),
            Pick::Literal(_) | Pick::Nothing => (candidates.first(), Outcome::Fallback),
        };

        let event = AlignmentEvent::now(&run.name, at, StepKind::Scene, &target, outcome)
            .with_candidates(candidates.len())
            .with_rollback(run.steps[at].rollback);

        match chosen.and_then(scene_node) {
            Some(node) => {
                let event = event.with_identity(node.identity());
                run.advance(node);
                self.record(run, event);
            }
            None => {
                warn!(step = at, "no scene candidates for '{}'", target);
                run.advance(MatchedNode::NoMatch);
                let mut event = event;
                event.outcome = Outcome::NoMatch;
                self.record(run, event);
            }
        }
    }

    fn enrich_scenes(&self, ranked: Vec<Ranked>) -> Vec<Candidate> {
        let ids: Vec<NodeId> = ranked.iter().map(|r| r.identity.clone()).collect();
        let mut details = self.graph.details_for_scenes(&ids);

        ranked
            .into_iter()
            .filter_map(|r| {
                let Some(detail) = details.remove(&r.identity) else {
                    debug!("scene {} has no graph detail, dropped", r.identity);
                    return None;
                };
                let (name, description) = match self.index.scene(&r.identity) {
                    Some(node) => (node.name.clone(), node.description.clone()),
                    None => (detail.name, detail.description),
                };
                Some(Candidate {
                    identity: r.identity,
                    score: r.score,
                    detail: CandidateDetail::Scene { name, description },
                })
            })
            .collect()
    }

    // ---- Action steps ----

    fn match_action(&self, run: &mut AlignmentRun) {
        let at = run.cursor;
        let target = run.steps[at].text.clone();
        info!(
            step = at,
            total = run.steps.len(),
            rollback = run.steps[at].rollback.count(),
            "matching action '{}'",
            target
        );

        let restrict: HashSet<NodeId> = run
            .current_scene()
            .map(|scene| self.graph.outgoing_actions(scene).into_iter().collect())
            .unwrap_or_default();

        let mut pool = self.index.action_candidates(&restrict);
        pool.retain(|entry| !run.steps[at].rejected.contains(entry.identity));
        debug!(
            restricted = restrict.len(),
            pool = pool.len(),
            "action candidate pool"
        );

        let ranked = self.rank(&target, &pool, self.config.action_top_k);
        let candidates = self.enrich_actions(ranked);

        let decision = if candidates.is_empty() {
            None
        } else {
            self.ask(StepKind::Action, &target, &candidates, &run.context)
        };

        let event = AlignmentEvent::now(&run.name, at, StepKind::Action, &target, Outcome::Selected)
            .with_candidates(candidates.len());

        match pick(decision, &candidates) {
            Pick::Chosen(candidate) => {
                let Some(node) = action_node(candidate) else {
                    return self.fail_action(run, event);
                };
                run.steps[at].rejected.insert(candidate.identity.clone());
                let event = event
                    .with_identity(Some(&candidate.identity))
                    .with_rollback(run.steps[at].rollback);
                run.advance(node);
                self.record(run, event);
            }
            Pick::Literal(text) => {
                let mut event = event.with_rollback(run.steps[at].rollback);
                event.outcome = Outcome::LiteralInput;
                run.advance(MatchedNode::LiteralInput { text });
                self.record(run, event);
            }
            Pick::Nothing => self.fail_action(run, event),
        }
    }

    fn fail_action(&self, run: &mut AlignmentRun, mut event: AlignmentEvent) {
        let at = run.cursor;
        match plan_rollback(run.steps[at].rollback, at) {
            RollbackMove::Back { steps, next } => {
                warn!(step = at, back = steps, "match failed, rolling back");
                run.steps[at].rollback = next;
                run.retreat(steps);
                event.outcome = Outcome::RolledBack;
                event.rollback = next;
            }
            RollbackMove::GiveUp => {
                warn!(step = at, "no match for '{}', giving up on step", event.target);
                run.advance(MatchedNode::NoMatch);
                event.outcome = Outcome::NoMatch;
                event.rollback = run.steps[at].rollback;
            }
        }
        self.record(run, event);
    }

    fn enrich_actions(&self, ranked: Vec<Ranked>) -> Vec<Candidate> {
        let ids: Vec<NodeId> = ranked.iter().map(|r| r.identity.clone()).collect();
        let mut details = self.graph.details_for_actions(&ids);

        ranked
            .into_iter()
            .filter_map(|r| {
                let Some(detail) = details.remove(&r.identity) else {
                    debug!("action {} has no graph detail, dropped", r.identity);
                    return None;
                };
                let Some(arrival) = self.graph.arrival_scene(&r.identity) else {
                    debug!("action {} has no arrival scene, dropped", r.identity);
                    return None;
                };
                let recorded = self.index.action(&r.identity);
                let (name, description) = match recorded {
                    Some(node) => (node.name.clone(), node.description.clone()),
                    None => (detail.name, detail.description),
                };
                Some(Candidate {
                    score: r.score,
                    detail: CandidateDetail::Action {
                        name,
                        description,
                        bounds: detail.bounds.or(recorded.map(|n| n.bounds)),
                        resource_id: detail.resource_id,
                        arrival,
                    },
                    identity: r.identity,
                })
            })
            .collect()
    }

    // ---- Shared ----

    fn rank(&self, target: &str, pool: &[PoolEntry<'_>], k: usize) -> Vec<Ranked> {
        match self.ranker.rank(target, pool, k) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!("could not rank candidates for '{}': {}", target, e);
                Vec::new()
            }
        }
    }

    fn ask(
        &self,
        kind: StepKind,
        target: &str,
        candidates: &[Candidate],
        context: &str,
    ) -> Option<Decision> {
        let request = ArbiterRequest {
            kind,
            target,
            candidates,
            context,
        };
        match self.arbiter.choose(&request) {
            Ok(decision) => {
                debug!(?decision, "arbiter decision");
                Some(decision)
            }
            Err(e) => {
                warn!("arbiter unavailable, treating as no match: {}", e);
                None
            }
        }
    }

    fn record(&self, run: &mut AlignmentRun, event: AlignmentEvent) {
        let event = event.with_cursor(run.cursor);
        if let Some(tracer) = self.tracer {
            tracer.record(&event);
        }
        run.events.push(event);
    }
}

fn pick(decision: Option<Decision>, candidates: &[Candidate]) -> Pick<'_> {
    match decision {
        Some(Decision::Selected { index }) => {
            match index.checked_sub(1).and_then(|i| candidates.get(i)) {
                Some(c) => Pick::Chosen(c),
                None => {
                    warn!(index, offered = candidates.len(), "arbiter chose out of range");
                    Pick::Nothing
                }
            }
        }
        Some(Decision::LiteralInput { text }) => Pick::Literal(text),
        Some(Decision::NoMatch) | None => Pick::Nothing,
    }
}

fn scene_node(candidate: &Candidate) -> Option<MatchedNode> {
    match &candidate.detail {
        CandidateDetail::Scene { name, description } => Some(MatchedNode::Scene {
            identity: candidate.identity.clone(),
            name: name.clone(),
            description: description.clone(),
        }),
        CandidateDetail::Action { .. } => None,
    }
}

fn action_node(candidate: &Candidate) -> Option<MatchedNode> {
    match &candidate.detail {
        CandidateDetail::Action {
            name,
            description,
            bounds,
            resource_id,
            arrival,
        } => Some(MatchedNode::Action {
            identity: candidate.identity.clone(),
            name: name.clone(),
            description: description.clone(),
            bounds: *bounds,
            resource_id: resource_id.clone(),
            arrival: arrival.clone(),
        }),
        CandidateDetail::Scene { .. } => None,
    }
}
