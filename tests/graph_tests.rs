use flow_aligner::graph::{
    graph_query::{ActionDetail, GraphQuery, SceneDetail},
    neo4j::{Neo4jGraph, decode_bounds, parse_rows},
    recorded::RecordedGraph,
};
use flow_aligner::index::{identity::NodeId, record::Bounds};
use serde_json::json;

mod common;

use common::fixtures::{
    DISPLAY, MAIN, OPEN_DISPLAY, OPEN_SEARCH, OPEN_SETTINGS, SEARCH, SEARCH_QUERY, SETTINGS,
    TOGGLE_DARK, action, scene, settings_app, settings_app_events,
};

// ============================================================================
// RecordedGraph
// ============================================================================

#[test]
fn recorded_graph_counts() {
    let (_, graph) = settings_app();
    assert_eq!(graph.scene_count(), 4);
    assert_eq!(graph.action_count(), 5);
    // five scene->action edges plus five action->scene edges
    assert_eq!(graph.edge_count(), 10);
}

#[test]
fn outgoing_actions_follow_recording_order() {
    let (_, graph) = settings_app();
    assert_eq!(
        graph.outgoing_actions(&scene(MAIN)),
        vec![action(OPEN_SETTINGS), action(OPEN_SEARCH)]
    );
    assert_eq!(graph.outgoing_actions(&scene(SETTINGS)), vec![action(OPEN_DISPLAY)]);
    assert!(graph.outgoing_actions(&NodeId::from("nowhere")).is_empty());
}

#[test]
fn repeated_transition_is_not_duplicated() {
    let mut events = settings_app_events();
    events.push(events[0].clone());
    let graph = RecordedGraph::from_events(&events);
    assert_eq!(graph.outgoing_actions(&scene(MAIN)).len(), 2);
    assert_eq!(graph.edge_count(), 10);
}

#[test]
fn arrival_scene_keeps_first_recorded_target() {
    let (_, mut graph) = settings_app();
    graph.add_transition(&scene(MAIN), &action(OPEN_SETTINGS), &scene(SEARCH));

    let arrival = graph.arrival_scene(&action(OPEN_SETTINGS)).unwrap();
    assert_eq!(arrival.identity, scene(SETTINGS));
    assert_eq!(arrival.name, "settings page");
    assert_eq!(arrival.description, "the settings page");

    let self_loop = graph.arrival_scene(&action(TOGGLE_DARK)).unwrap();
    assert_eq!(self_loop.identity, scene(DISPLAY));
    assert!(graph.arrival_scene(&NodeId::from("unknown")).is_none());
}

#[test]
fn arrival_scene_needs_scene_detail() {
    let mut graph = RecordedGraph::new();
    graph.add_transition(&scene("a"), &NodeId::from("act"), &scene("b"));
    assert!(graph.arrival_scene(&NodeId::from("act")).is_none());
}

#[test]
fn detail_lookups_skip_unknown_ids() {
    let (_, graph) = settings_app();
    let scenes = graph.details_for_scenes(&[scene(MAIN), NodeId::from("ghost")]);
    assert_eq!(scenes.len(), 1);
    assert_eq!(
        scenes[&scene(MAIN)],
        SceneDetail {
            name: "main page".into(),
            description: "the main page".into(),
        }
    );

    let actions = graph.details_for_actions(&[action(SEARCH_QUERY)]);
    let detail: &ActionDetail = &actions[&action(SEARCH_QUERY)];
    assert_eq!(detail.name, "enter search query");
    assert_eq!(detail.bounds, Some(Bounds([[0, 100], [1080, 220]])));
    assert_eq!(detail.resource_id.as_deref(), Some("id/enter_search_query"));

    assert!(graph.details_for_scenes(&[]).is_empty());
}

// ============================================================================
// Neo4j wire handling
// ============================================================================

#[test]
fn parse_rows_flattens_results() {
    let body = json!({
        "results": [{
            "columns": ["s.hash_id", "s.name", "s.description"],
            "data": [
                {"row": ["h1", "main page", "home"], "meta": []},
                {"row": ["h2", "settings page", "prefs"], "meta": []}
            ]
        }],
        "errors": []
    })
    .to_string();

    let rows = parse_rows(&body).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1], json!("settings page"));
}

#[test]
fn parse_rows_surfaces_cypher_errors() {
    let body = json!({
        "results": [],
        "errors": [{"code": "Neo.ClientError.Statement.SyntaxError", "message": "bad"}]
    })
    .to_string();
    let err = parse_rows(&body).unwrap_err();
    assert!(err.to_string().contains("SyntaxError"));

    assert!(parse_rows("<html>").is_err());
}

#[test]
fn decode_bounds_accepts_text_or_json() {
    let expected = Some(Bounds([[10, 20], [30, 40]]));
    assert_eq!(decode_bounds(Some(&json!("[[10, 20], [30, 40]]"))), expected);
    assert_eq!(decode_bounds(Some(&json!([[10, 20], [30, 40]]))), expected);
    assert_eq!(decode_bounds(Some(&json!("garbage"))), None);
    assert_eq!(decode_bounds(Some(&json!(null))), None);
    assert_eq!(decode_bounds(None), None);
}

#[test]
fn unreachable_neo4j_degrades_to_empty() {
    let graph = Neo4jGraph::new("http://127.0.0.1:1", "neo4j", "neo4j", None).unwrap();
    assert!(graph.details_for_scenes(&[scene(MAIN)]).is_empty());
    assert!(graph.details_for_actions(&[action(OPEN_SETTINGS)]).is_empty());
    assert!(graph.outgoing_actions(&scene(MAIN)).is_empty());
    assert!(graph.arrival_scene(&action(OPEN_SETTINGS)).is_none());
}
