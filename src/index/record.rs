use std::cmp::Ordering;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::LoadError;

// ============================================================================
// Recorded interaction events
// ============================================================================

/// One recorded UI interaction: the app moved from `start_state` to
/// `stop_state` because the user interacted with `event.view`.
///
/// Every field is required. Records missing any of them fail to deserialize
/// and are skipped by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Content hash of the scene before the interaction
    pub start_state: String,

    /// Content hash of the scene after the interaction
    pub stop_state: String,

    pub event: EventInfo,

    /// Model-generated names and descriptions for both scenes and the action
    pub gpt_out: EventSemantics,

    pub embedding: EventEmbeddings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub event_type: InteractionType,
    pub view: ViewInfo,
}

/// The UI element the interaction targeted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewInfo {
    /// Element signature; hashed into the action identity
    pub view_str: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub resource_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSemantics {
    pub previous_page_name: String,
    pub previous_page_description: String,
    pub current_page_name: String,
    pub current_page_description: String,
    pub action_name: String,
    pub action_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEmbeddings {
    pub previous_page_name_embedding: Vec<f32>,
    pub current_page_name_embedding: Vec<f32>,
    pub action_name_embedding: Vec<f32>,
}

/// Screen rectangle as `[[left, top], [right, bottom]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds(pub [[i64; 2]; 2]);

/// Kind of interaction recorded for an action node.
///
/// Kinds the recorder emits beyond the named ones are kept verbatim in
/// `Other`, so the raw string survives into replayable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionType {
    Touch,
    LongTouch,
    SetText,
    Scroll,
    Swipe,
    Key,
    Intent,
    Other(String),
}

impl InteractionType {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionType::Touch => "touch",
            InteractionType::LongTouch => "long_touch",
            InteractionType::SetText => "set_text",
            InteractionType::Scroll => "scroll",
            InteractionType::Swipe => "swipe",
            InteractionType::Key => "key",
            InteractionType::Intent => "intent",
            InteractionType::Other(raw) => raw,
        }
    }
}

impl From<String> for InteractionType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "touch" => InteractionType::Touch,
            "long_touch" => InteractionType::LongTouch,
            "set_text" => InteractionType::SetText,
            "scroll" => InteractionType::Scroll,
            "swipe" => InteractionType::Swipe,
            "key" => InteractionType::Key,
            "intent" => InteractionType::Intent,
            _ => InteractionType::Other(raw),
        }
    }
}

impl From<InteractionType> for String {
    fn from(kind: InteractionType) -> Self {
        match kind {
            InteractionType::Other(raw) => raw,
            named => named.as_str().to_string(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load every `*.json` event under `dir`, in natural filename order.
///
/// Empty, unparseable or incomplete files are skipped. Only a missing or
/// unreadable directory is an error.
pub fn load_events(dir: &Path) -> Result<Vec<InteractionEvent>, LoadError> {
    let start = Instant::now();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| LoadError::io(dir, e))? {
        let entry = entry.map_err(|e| LoadError::io(dir, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| {
        let a = a.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let b = b.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        natural_cmp(&a, &b)
    });

    let mut events = Vec::with_capacity(files.len());
    let mut skipped = 0usize;
    for path in &files {
        match parse_event_file(path) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    info!(
        loaded = events.len(),
        skipped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "loaded interaction events from {}",
        dir.display()
    );
    Ok(events)
}

fn parse_event_file(path: &Path) -> Option<InteractionEvent> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!("skipping {}: {}", path.display(), e);
            return None;
        }
    };
    match parse_event(&content) {
        Some(event) => Some(event),
        None => {
            debug!("skipping incomplete event {}", path.display());
            None
        }
    }
}

/// Parse one event record. `None` for anything malformed or incomplete.
pub fn parse_event(content: &str) -> Option<InteractionEvent> {
    serde_json::from_str(content).ok()
}

/// Compare names so that `event_2` sorts before `event_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                let ord = compare_digit_runs(&left, &right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        chars.next();
    }
    run
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
        .then_with(|| a.len().cmp(&b.len()))
}
