use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::error::LoadError;
use crate::trace::trace::{AlignmentEvent, Outcome};

/// Running counts of what a trace has recorded, across every scenario of a
/// batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceTally {
    pub written: usize,
    pub selected: usize,
    pub fallbacks: usize,
    pub rollbacks: usize,
    pub no_matches: usize,
}

impl TraceTally {
    fn count(&mut self, outcome: Outcome) {
        self.written += 1;
        match outcome {
            Outcome::Selected | Outcome::LiteralInput => self.selected += 1,
            Outcome::Fallback => self.fallbacks += 1,
            Outcome::RolledBack => self.rollbacks += 1,
            Outcome::NoMatch => self.no_matches += 1,
        }
    }
}

struct TraceSink {
    file: File,
    tally: TraceTally,
}

/// JSON-lines sink for engine transitions, one `AlignmentEvent` per line.
///
/// Shared by reference between alignment runs; a disabled logger accepts and
/// drops everything.
pub struct TraceLogger {
    sink: Option<Mutex<TraceSink>>,
}

impl TraceLogger {
    /// Open `path` for appending, creating missing parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LoadError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoadError::io(path, e))?;

        Ok(Self {
            sink: Some(Mutex::new(TraceSink {
                file,
                tally: TraceTally::default(),
            })),
        })
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Append one transition. Write failures are reported and the event is
    /// dropped; alignment carries on either way.
    pub fn record(&self, event: &AlignmentEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        let mut line = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(step = event.step, "could not serialize alignment event: {}", e);
                return;
            }
        };
        line.push('\n');

        let Ok(mut sink) = sink.lock() else {
            warn!("alignment trace lock poisoned, event dropped");
            return;
        };
        match sink.file.write_all(line.as_bytes()) {
            Ok(()) => sink.tally.count(event.outcome),
            Err(e) => warn!(scenario = %event.scenario, "could not write alignment event: {}", e),
        }
    }

    /// Counts of everything written so far; all zero when disabled.
    pub fn tally(&self) -> TraceTally {
        self.sink
            .as_ref()
            .and_then(|sink| sink.lock().ok().map(|s| s.tally))
            .unwrap_or_default()
    }
}
