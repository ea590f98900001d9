use std::path::Path;

use flow_aligner::embedding::embedder::HashingEmbedder;
use flow_aligner::graph::recorded::RecordedGraph;
use flow_aligner::index::{
    candidate_index::CandidateIndex,
    identity::{NodeId, action_identity},
    record::{
        Bounds, EventEmbeddings, EventInfo, EventSemantics, InteractionEvent, InteractionType,
        ViewInfo,
    },
};

// ============================================================================
// A small settings app
//
//   main --open settings--> settings --open display settings--> display
//   main --open search--> search --enter search query--> search
//   display --toggle dark mode--> display
// ============================================================================

pub const MAIN: &str = "scene-main";
pub const SETTINGS: &str = "scene-settings";
pub const DISPLAY: &str = "scene-display";
pub const SEARCH: &str = "scene-search";

pub const OPEN_SETTINGS: &str = "Button[text=Settings]";
pub const OPEN_DISPLAY: &str = "Row[text=Display]";
pub const TOGGLE_DARK: &str = "Switch[id=dark_mode]";
pub const OPEN_SEARCH: &str = "Button[desc=Search]";
pub const SEARCH_QUERY: &str = "EditText[id=query]";

pub fn embedder() -> HashingEmbedder {
    HashingEmbedder::default()
}

fn scene_name(id: &str) -> &'static str {
    match id {
        MAIN => "main page",
        SETTINGS => "settings page",
        DISPLAY => "display settings page",
        SEARCH => "search page",
        _ => "unknown page",
    }
}

/// One recorded interaction with hashing-embedder vectors.
pub fn event(
    start: &str,
    stop: &str,
    view_str: &str,
    action_name: &str,
    event_type: InteractionType,
) -> InteractionEvent {
    let emb = embedder();
    let previous = scene_name(start);
    let current = scene_name(stop);
    InteractionEvent {
        start_state: start.to_string(),
        stop_state: stop.to_string(),
        event: EventInfo {
            event_type,
            view: ViewInfo {
                view_str: view_str.to_string(),
                bounds: Bounds([[0, 100], [1080, 220]]),
                resource_id: Some(format!("id/{}", action_name.replace(' ', "_"))),
            },
        },
        gpt_out: EventSemantics {
            previous_page_name: previous.to_string(),
            previous_page_description: format!("the {}", previous),
            current_page_name: current.to_string(),
            current_page_description: format!("the {}", current),
            action_name: action_name.to_string(),
            action_description: format!("tap to {}", action_name),
        },
        embedding: EventEmbeddings {
            previous_page_name_embedding: emb.vector(previous),
            current_page_name_embedding: emb.vector(current),
            action_name_embedding: emb.vector(action_name),
        },
    }
}

pub fn settings_app_events() -> Vec<InteractionEvent> {
    vec![
        event(MAIN, SETTINGS, OPEN_SETTINGS, "open settings", InteractionType::Touch),
        event(MAIN, SEARCH, OPEN_SEARCH, "open search", InteractionType::Touch),
        event(SETTINGS, DISPLAY, OPEN_DISPLAY, "open display settings", InteractionType::Touch),
        event(DISPLAY, DISPLAY, TOGGLE_DARK, "toggle dark mode", InteractionType::Touch),
        event(SEARCH, SEARCH, SEARCH_QUERY, "enter search query", InteractionType::SetText),
    ]
}

pub fn settings_app() -> (CandidateIndex, RecordedGraph) {
    let events = settings_app_events();
    (
        CandidateIndex::from_events(&events),
        RecordedGraph::from_events(&events),
    )
}

pub fn scene(id: &str) -> NodeId {
    NodeId::from(id)
}

pub fn action(view_str: &str) -> NodeId {
    action_identity(view_str)
}

/// Write events as `event_<n>.json` plus the given extra raw files.
pub fn write_events(dir: &Path, events: &[InteractionEvent]) {
    std::fs::create_dir_all(dir).unwrap();
    for (i, event) in events.iter().enumerate() {
        let json = serde_json::to_string_pretty(event).unwrap();
        std::fs::write(dir.join(format!("event_{}.json", i)), json).unwrap();
    }
}

/// Write `<cases>/<name>/flow_path.json`.
pub fn write_case(cases: &Path, name: &str, json: &str) {
    let dir = cases.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("flow_path.json"), json).unwrap();
}
