mod memory;
mod sqlite;

pub use memory::InMemoryJournal;
pub use sqlite::SqliteJournal;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::ConsoleOutputMode;
use crate::Detection;

/// Timestamped per-frame snapshot row. Append-only, immutable once written.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp: f64,
    pub frame_count: usize,
    pub active_count: usize,
    pub total_unique: u64,
    pub total_visits: u64,
    pub detections: Vec<Detection>,
}

/// Discrete notification written once per underlying counter transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CounterEvent {
    pub kind: EventKind,
    pub counter_value: u64,
    pub timestamp: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Visit,
    NewUnique,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Visit => "visit",
            EventKind::NewUnique => "new_unique",
        }
    }
}

/// Periodic telemetry row, written off the frame path.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub celsius: f64,
    pub timestamp: f64,
    pub fps: Option<f64>,
}

/// Append-only sink for the session's records, counter events, and telemetry.
///
/// Writes may buffer or block briefly; the pipeline treats failures as
/// non-fatal and keeps its in-memory counters authoritative.
pub trait EventJournal {
    /// At most once per frame, gated by the emission policy.
    fn write_record(&mut self, record: &FrameRecord) -> Result<()>;

    /// Exactly once per counter transition.
    fn write_event(&mut self, event: &CounterEvent) -> Result<()>;

    /// Independent of the frame path.
    fn write_temperature(&mut self, sample: &TemperatureSample) -> Result<()>;
}

/// When a frame record gets written. Derived from the console output mode but
/// deliberately decoupled from it: the policy gates journal rows, the mode
/// gates console lines, and neither touches the counting state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmissionPolicy {
    /// Every frame that carried detections.
    All,
    /// Only frames on which a visit started.
    ChangesOnly,
    /// Same record gating as `ChangesOnly`; the daemon additionally drops
    /// its periodic console statistics.
    Minimal,
}

impl EmissionPolicy {
    pub fn from_console_mode(mode: ConsoleOutputMode) -> Self {
        match mode {
            ConsoleOutputMode::All => EmissionPolicy::All,
            ConsoleOutputMode::ChangesOnly => EmissionPolicy::ChangesOnly,
            ConsoleOutputMode::Minimal => EmissionPolicy::Minimal,
        }
    }

    /// Frames without detections are never recorded; beyond that, only `All`
    /// records frames that did not start a visit.
    pub fn should_write_record(&self, frame_count: usize, visit_started: bool) -> bool {
        if frame_count == 0 {
            return false;
        }
        match self {
            EmissionPolicy::All => true,
            EmissionPolicy::ChangesOnly | EmissionPolicy::Minimal => visit_started,
        }
    }
}

/// Compact "label: (x,y)" listing stored alongside record rows, matching the
/// legacy log column format.
pub(crate) fn coords_summary(detections: &[Detection]) -> String {
    detections
        .iter()
        .map(|det| format!("{}: ({:.2},{:.2})", det.label, det.x, det.y))
        .collect::<Vec<_>>()
        .join("; ")
}
