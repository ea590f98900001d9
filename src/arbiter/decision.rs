use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// What the arbiter decided for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// 1-based position in the candidate list as presented
    Selected { index: usize },
    /// None of the candidates fit
    NoMatch,
    /// The step is free-text data entry rather than a selection
    LiteralInput { text: String },
}

impl Decision {
    pub fn selected(index: usize) -> Self {
        Decision::Selected { index }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Decision::LiteralInput { text: text.into() }
    }
}

/// Wire form: `{"index": n, "input_text": "..."}` where `0` means no match,
/// `-1` means literal input and any positive `n` selects candidate `n`.
#[derive(Debug, Deserialize)]
struct DecisionPayload {
    index: i64,
    #[serde(default)]
    input_text: Option<String>,
}

impl TryFrom<DecisionPayload> for Decision {
    type Error = ();

    fn try_from(p: DecisionPayload) -> Result<Self, Self::Error> {
        match p.index {
            -1 => p.input_text.map(Decision::literal).ok_or(()),
            n if n > 0 => Ok(Decision::selected(n as usize)),
            0 => Ok(Decision::NoMatch),
            _ => Err(()),
        }
    }
}

/// Pull the first well-formed decision object out of free text.
///
/// Models often wrap the JSON in prose or code fences; every `{...}` span
/// (up to the first closing brace) is tried in order.
pub fn extract_decision(raw: &str) -> Result<Decision, ServiceError> {
    for (start, _) in raw.match_indices('{') {
        let Some(len) = raw[start..].find('}') else {
            break;
        };
        let span = &raw[start..=start + len];
        if let Ok(payload) = serde_json::from_str::<DecisionPayload>(span) {
            if let Ok(decision) = Decision::try_from(payload) {
                return Ok(decision);
            }
        }
    }
    Err(ServiceError::NoDecision(preview(raw)))
}

fn preview(raw: &str) -> String {
    const MAX: usize = 200;
    match raw.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => raw.to_string(),
    }
}
