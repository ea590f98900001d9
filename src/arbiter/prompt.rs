use crate::arbiter::arbiter::ArbiterRequest;
use crate::engine::engine_model::StepKind;

pub const SYSTEM_PROMPT: &str = "You map steps of a mobile app test scenario onto recorded UI \
     scenes and actions. You answer with a single JSON object and nothing else.";

/// Build the user prompt for one arbitration.
pub fn build_prompt(request: &ArbiterRequest<'_>) -> String {
    let candidates = request.formatted_candidates();
    let candidates = if candidates.is_empty() {
        "(none)".to_string()
    } else {
        candidates.join("\n")
    };

    match request.kind {
        StepKind::Scene => format!(
            r#"The full test scenario is: {context}

Pick the recorded scene that best matches the starting scene "{target}".

SCENE CANDIDATES:
{candidates}

Respond with ONLY a JSON object:
- {{"index": n}} to choose candidate n (1-based)
- {{"index": 0}} if no candidate matches"#,
            context = request.context,
            target = request.target,
            candidates = candidates,
        ),
        StepKind::Action => format!(
            r#"The full test scenario is: {context}

Pick the recorded action that performs the step "{target}". Use the arrival
scene of each candidate to check that it leads where the scenario goes next.

ACTION CANDIDATES:
{candidates}

Respond with ONLY a JSON object:
- {{"index": n}} to choose candidate n (1-based)
- {{"index": 0}} if no candidate matches
- {{"index": -1, "input_text": "..."}} if the step types text into a field; give the text to type"#,
            context = request.context,
            target = request.target,
            candidates = candidates,
        ),
    }
}
