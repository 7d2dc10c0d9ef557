//! feeder-watch
//!
//! Presence tracking and visit detection for a camera-monitored bird feeder.
//!
//! # Architecture
//!
//! The crate turns a stream of per-frame detection lists into two durable
//! session counters and an append-only journal:
//!
//! - `detect`: detection model, pre-filtering, and frame sources
//! - `tracker`: the visit-detection state machine, the presence tracker with
//!   its timeout-expired identity slots, and the session counters
//! - `journal`: the append-only session journal (records, counter events,
//!   temperature samples) with SQLite and in-memory stores
//! - `pipeline`: per-frame orchestration tying the tracker to the journal
//! - `telemetry`: CPU temperature probe, FPS meter, and the periodic sampler
//! - `snapshot`: throttled photo saving with session-unique numbering
//!
//! Counters are session-scoped and in-memory; the journal is the only
//! persistent artifact. Exactly one driver thread feeds the pipeline; the
//! telemetry sampler runs on its own thread and only reads the shared FPS
//! value.

use anyhow::Result;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod config;
pub mod detect;
pub mod journal;
pub mod pipeline;
pub mod snapshot;
pub mod telemetry;
pub mod tracker;

pub use config::{ConsoleOutputMode, FeederdConfig, TrackingSettings};
pub use detect::{
    Detection, DetectionFilter, DetectionSource, FrameObservation, ScriptedSource, StubSource,
};
pub use journal::{
    CounterEvent, EmissionPolicy, EventJournal, EventKind, FrameRecord, InMemoryJournal,
    SqliteJournal, TemperatureSample,
};
pub use pipeline::FramePipeline;
pub use snapshot::{FilesystemSnapshotStore, SnapshotGate, SnapshotSink};
pub use telemetry::{CpuTemperature, FpsMeter, TelemetrySampler};
pub use tracker::{
    CounterChanges, FrameUpdate, PresenceTracker, SessionCounters, SessionStats, VisitDetector,
};

/// Wall-clock seconds since the Unix epoch, as the fractional timestamp the
/// tracker and journal operate on.
pub fn now_s() -> Result<f64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs_f64())
}
