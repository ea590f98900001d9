use flow_aligner::arbiter::{arbiter::ScriptedArbiter, decision::Decision};
use flow_aligner::engine::{aligner::Aligner, engine_model::{DEFAULT_SCENE, StepKind}};
use flow_aligner::scenario::{
    codegen::{STATUS_PARTIAL, STATUS_SUCCESS, apply_alignment, executable_actions, step_outcomes},
    scenario_model::{OutcomeStatus, ScenarioRecord, load_scenario, save_scenario},
};

mod common;

use flow_aligner::graph::recorded::RecordedGraph;
use flow_aligner::index::{candidate_index::CandidateIndex, record::InteractionType};

use common::fixtures::{
    MAIN, OPEN_SEARCH, OPEN_SETTINGS, SETTINGS, action, embedder, event, scene, settings_app,
};

const AUTHORED: &str = r#"{
  "pre_conditions": "",
  "steps": [
    {"action_des": "open settings", "expected": "settings are shown"},
    {"action_des": "  open display settings  "}
  ],
  "priority": "high"
}"#;

// ============================================================================
// Scenario records
// ============================================================================

#[test]
fn record_keeps_unknown_fields() {
    let record: ScenarioRecord = serde_json::from_str(AUTHORED).unwrap();
    assert_eq!(record.steps.len(), 2);
    assert_eq!(record.extra["priority"], "high");
    assert_eq!(record.steps[0].extra["expected"], "settings are shown");

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["priority"], "high");
    assert_eq!(json["steps"][0]["action_des"], "open settings");
    assert!(json.get("code").is_none());
    assert!(json.get("note").is_none());
}

#[test]
fn description_alias_is_accepted() {
    let record: ScenarioRecord =
        serde_json::from_str(r#"{"steps": [{"description": "toggle dark mode"}]}"#).unwrap();
    assert_eq!(record.steps[0].description, "toggle dark mode");
    assert_eq!(record.pre_conditions, None);
}

#[test]
fn blank_pre_condition_opens_on_default_scene() {
    let record: ScenarioRecord = serde_json::from_str(AUTHORED).unwrap();
    let steps = record.target_steps(DEFAULT_SCENE);
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0].kind, StepKind::Scene);
    assert_eq!(steps[0].text, "main page");
    assert_eq!(steps[2].text, "open display settings");

    let custom = ScenarioRecord::new(Some("  search page "), &["type \"x\""]);
    assert_eq!(custom.opening_scene(DEFAULT_SCENE), "search page");
}

#[test]
fn plan_carries_scenario_name_and_context() {
    let record = ScenarioRecord::new(None, &["open settings", "toggle dark mode"]);
    let plan = record.plan("case-dark", "home");
    assert_eq!(plan.name, "case-dark");
    assert_eq!(plan.context, "home, open settings, toggle dark mode");
}

#[test]
fn load_and_save_round_trip_on_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("flow_path.json");
    std::fs::write(&path, AUTHORED).unwrap();

    let mut record = load_scenario(&path).unwrap();
    record.note = Some(STATUS_SUCCESS.into());
    save_scenario(&path, &record).unwrap();

    let reloaded = load_scenario(&path).unwrap();
    assert_eq!(reloaded, record);
    assert!(load_scenario(&tmp.path().join("missing.json")).is_err());

    std::fs::write(&path, "{ not json").unwrap();
    assert!(load_scenario(&path).is_err());
}

// ============================================================================
// Code generation
// ============================================================================

#[test]
fn full_match_writes_success_and_actions() {
    let (index, graph) = settings_app();
    let emb = embedder();
    let arbiter = ScriptedArbiter::new([]);
    let aligner = Aligner::new(&index, &emb, &graph, &arbiter);

    let mut record = ScenarioRecord::new(None, &["open settings"]);
    let alignment = aligner.align(record.plan("case-settings", DEFAULT_SCENE));
    apply_alignment(&mut record, &alignment, &index);

    assert_eq!(record.note.as_deref(), Some(STATUS_SUCCESS));
    assert_eq!(record.code.len(), 1);
    let code = &record.code[0];
    assert_eq!(code.action_type, "touch");
    assert_eq!(code.action_name, "open settings");
    assert_eq!(code.action_description.as_deref(), Some("tap to open settings"));
    assert!(code.bounds.is_some());
    assert_eq!(code.input_text, None);

    assert_eq!(record.outcomes.len(), 2);
    assert_eq!(record.outcomes[0].identity, Some(scene(MAIN)));
    assert_eq!(record.outcomes[1].identity, Some(action(OPEN_SETTINGS)));
    assert!(record.outcomes.iter().all(|o| o.status == OutcomeStatus::Matched));
}

#[test]
fn literal_input_becomes_input_action() {
    let (index, graph) = settings_app();
    let emb = embedder();
    let arbiter = ScriptedArbiter::new([
        Some(Decision::selected(1)),
        Some(Decision::selected(1)),
        Some(Decision::literal("weather")),
    ]);
    let aligner = Aligner::new(&index, &emb, &graph, &arbiter);
    let alignment = aligner.align(
        ScenarioRecord::new(None, &["open search", "type weather"]).plan("c", DEFAULT_SCENE),
    );

    let code = executable_actions(&alignment.path, &index);
    assert_eq!(code.len(), 2);
    assert_eq!(code[0].action_name, "open search");
    assert_eq!(code[1].action_type, "input");
    assert_eq!(code[1].input_text.as_deref(), Some("weather"));

    let outcomes = step_outcomes(&alignment);
    assert_eq!(outcomes[1].identity, Some(action(OPEN_SEARCH)));
    assert_eq!(outcomes[2].status, OutcomeStatus::LiteralInput);
    assert_eq!(outcomes[2].identity, None);
}

#[test]
fn recorded_interaction_type_is_written_verbatim() {
    let events = vec![event(
        MAIN,
        SETTINGS,
        OPEN_SETTINGS,
        "check remember me",
        InteractionType::Other("select".into()),
    )];
    let index = CandidateIndex::from_events(&events);
    let graph = RecordedGraph::from_events(&events);
    let emb = embedder();
    let arbiter = ScriptedArbiter::new([]);
    let aligner = Aligner::new(&index, &emb, &graph, &arbiter);

    let mut record = ScenarioRecord::new(None, &["check remember me"]);
    let alignment = aligner.align(record.plan("case-select", DEFAULT_SCENE));
    apply_alignment(&mut record, &alignment, &index);

    assert_eq!(record.code.len(), 1);
    assert_eq!(record.code[0].action_type, "select");
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["code"][0]["action_type"], "select");
}

#[test]
fn unmatched_step_marks_partial_and_is_listed() {
    let (index, graph) = settings_app();
    let emb = embedder();
    let arbiter = ScriptedArbiter::new([]).with_fallback(Decision::NoMatch);
    let aligner = Aligner::new(&index, &emb, &graph, &arbiter);

    let mut record = ScenarioRecord::new(None, &["order a pizza"]);
    let alignment = aligner.align(record.plan("case-pizza", DEFAULT_SCENE));
    apply_alignment(&mut record, &alignment, &index);

    assert_eq!(record.note.as_deref(), Some(STATUS_PARTIAL));
    assert!(record.code.is_empty());
    assert_eq!(record.outcomes.len(), 2);
    assert_eq!(record.outcomes[1].status, OutcomeStatus::NoMatch);
    assert_eq!(record.outcomes[1].target, "order a pizza");

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["outcomes"][1]["status"], "no_match");
}
