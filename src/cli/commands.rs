use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, warn};

use crate::arbiter::arbiter::{Arbiter, LexicalArbiter};
use crate::arbiter::chat::{ChatArbiter, ChatClient};
use crate::cli::config::{
    AppConfig, ArbiterConfig, ArbiterKind, EmbedderKind, EmbeddingConfig, GraphConfig, GraphKind,
};
use crate::embedding::embedder::{Embedder, HashingEmbedder, HttpEmbedder};
use crate::engine::aligner::Aligner;
use crate::error::LoadError;
use crate::graph::{graph_query::GraphQuery, neo4j::Neo4jGraph, recorded::RecordedGraph};
use crate::index::{
    candidate_index::CandidateIndex,
    record::{InteractionEvent, load_events},
};
use crate::scenario::{
    codegen::apply_alignment,
    scenario_model::{SCENARIO_FILE, load_scenario, save_scenario},
};
use crate::trace::logger::TraceLogger;

pub const EVENTS_DIR: &str = "events";
pub const CASES_DIR: &str = "test_cases";

/// Per-scenario result line of a batch run.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub steps: usize,
    pub unmatched: usize,
    pub rollbacks: usize,
    pub elapsed_ms: u128,
}

/// Outcome of `align` over a whole scenario directory.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub reports: Vec<CaseReport>,
    /// Scenario directories that could not be read or written
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn fully_matched(&self) -> usize {
        self.reports.iter().filter(|r| r.unmatched == 0).count()
    }
}

// ============================================================================
// align subcommand
// ============================================================================

pub fn cmd_align(
    data: &str,
    cases: Option<&str>,
    only: Option<&str>,
    config: &AppConfig,
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let root = Path::new(data);
    let events = load_events(&root.join(EVENTS_DIR))?;
    let embedder = build_embedder(&config.embedding)?;
    let index = build_index(&events, &config.embedding, embedder.as_ref())?;

    let arbiter = build_arbiter(&config.arbiter)?;
    let graph = build_graph(&config.graph, &events)?;
    let tracer = match &config.trace.path {
        Some(path) => TraceLogger::create(path).unwrap_or_else(|e| {
            warn!("alignment trace disabled: {}", e);
            TraceLogger::disabled()
        }),
        None => TraceLogger::disabled(),
    };

    let aligner = Aligner::new(&index, embedder.as_ref(), graph.as_ref(), arbiter.as_ref())
        .with_config(config.align.engine.clone())
        .with_tracer(&tracer);

    let cases_root = cases
        .map(PathBuf::from)
        .unwrap_or_else(|| root.join(CASES_DIR));
    let mut case_dirs = list_case_dirs(&cases_root, &config.align.skip_prefixes)?;
    if let Some(name) = only {
        case_dirs.retain(|dir| dir.file_name().is_some_and(|n| n == name));
    }

    info!(
        scenes = index.scene_count(),
        actions = index.action_count(),
        cases = case_dirs.len(),
        "starting batch alignment"
    );

    let mut summary = BatchSummary::default();
    for dir in &case_dirs {
        match run_case(&aligner, &index, dir) {
            Ok(report) => {
                println!(
                    "  {}: {} steps, {} unmatched, {} rollbacks ({} ms)",
                    report.name, report.steps, report.unmatched, report.rollbacks, report.elapsed_ms
                );
                summary.reports.push(report);
            }
            Err(e) => {
                warn!("skipping {}: {}", dir.display(), e);
                summary.failed.push(dir_name(dir));
            }
        }
    }

    println!(
        "Aligned {} scenarios ({} fully matched, {} failed)",
        summary.reports.len(),
        summary.fully_matched(),
        summary.failed.len()
    );
    if tracer.is_enabled() {
        let tally = tracer.tally();
        info!(
            written = tally.written,
            rollbacks = tally.rollbacks,
            no_matches = tally.no_matches,
            "alignment trace complete"
        );
    }

    Ok(summary)
}

/// Align one scenario directory and write the result back to its file.
pub fn run_case(
    aligner: &Aligner<'_>,
    index: &CandidateIndex,
    dir: &Path,
) -> Result<CaseReport, LoadError> {
    let started = Instant::now();
    let path = dir.join(SCENARIO_FILE);
    let mut record = load_scenario(&path)?;

    let name = dir_name(dir);
    let plan = record.plan(&name, &aligner.config().default_scene);
    let alignment = aligner.align(plan);

    apply_alignment(&mut record, &alignment, index);
    save_scenario(&path, &record)?;

    let report = CaseReport {
        name,
        steps: alignment.path.len(),
        unmatched: alignment.unmatched(),
        rollbacks: alignment.rollbacks(),
        elapsed_ms: started.elapsed().as_millis(),
    };
    info!(
        case = %report.name,
        unmatched = report.unmatched,
        elapsed_ms = report.elapsed_ms as u64,
        "scenario aligned"
    );
    Ok(report)
}

/// Scenario directories under `root`, sorted by name, minus those whose name
/// starts with a skip prefix.
pub fn list_case_dirs(root: &Path, skip_prefixes: &[String]) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(root).map_err(|e| LoadError::io(root, e))?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            let name = dir_name(path);
            !skip_prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(data: &str) -> Result<(), Box<dyn std::error::Error>> {
    let events = load_events(&Path::new(data).join(EVENTS_DIR))?;
    let index = CandidateIndex::from_events(&events);
    let graph = RecordedGraph::from_events(&events);

    println!("Events:  {}", events.len());
    println!("Scenes:  {}", index.scene_count());
    println!("Actions: {}", index.action_count());
    println!("Edges:   {}", graph.edge_count());
    Ok(())
}

// ============================================================================
// Backend construction
// ============================================================================

/// Index over the recorded events. The hashing backend cannot reproduce
/// the recorder's vectors, so its index is re-embedded from node names.
pub fn build_index(
    events: &[InteractionEvent],
    config: &EmbeddingConfig,
    embedder: &dyn Embedder,
) -> Result<CandidateIndex, Box<dyn std::error::Error>> {
    let mut index = CandidateIndex::from_events(events);
    if config.backend == EmbedderKind::Hashing {
        index.reembed(embedder)?;
    }
    Ok(index)
}

pub fn build_embedder(
    config: &EmbeddingConfig,
) -> Result<Box<dyn Embedder>, Box<dyn std::error::Error>> {
    match config.backend {
        EmbedderKind::Hashing => Ok(Box::new(HashingEmbedder {
            dimensions: config.dimensions,
        })),
        EmbedderKind::Http => {
            let api_key = std::env::var(&config.api_key_env).ok();
            if api_key.is_none() {
                warn!("{} is not set, calling {} without a key", config.api_key_env, config.endpoint);
            }
            Ok(Box::new(HttpEmbedder::new(
                &config.endpoint,
                &config.model,
                api_key,
                Default::default(),
            )?))
        }
    }
}

pub fn build_arbiter(
    config: &ArbiterConfig,
) -> Result<Box<dyn Arbiter>, Box<dyn std::error::Error>> {
    match config.backend {
        ArbiterKind::Lexical => Ok(Box::new(LexicalArbiter)),
        ArbiterKind::Chat => {
            let api_key = std::env::var(&config.api_key_env).ok();
            if api_key.is_none() {
                warn!("{} is not set, calling {} without a key", config.api_key_env, config.endpoint);
            }
            let client = ChatClient::new(
                &config.endpoint,
                &config.model,
                api_key,
                config.auth,
                config.max_tokens,
            )?;
            Ok(Box::new(ChatArbiter::new(client, config.retry_policy())))
        }
    }
}

pub fn build_graph(
    config: &GraphConfig,
    events: &[InteractionEvent],
) -> Result<Box<dyn GraphQuery>, Box<dyn std::error::Error>> {
    match config.backend {
        GraphKind::Recorded => Ok(Box::new(RecordedGraph::from_events(events))),
        GraphKind::Neo4j => {
            let password = std::env::var(&config.password_env).ok();
            Ok(Box::new(Neo4jGraph::new(
                &config.uri,
                &config.database,
                &config.user,
                password,
            )?))
        }
    }
}
