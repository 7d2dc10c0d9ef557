//! Per-frame orchestration: tracker update, counter snapshot, policy-gated
//! record emission, and per-transition event emission.

use crate::journal::{CounterEvent, EmissionPolicy, EventJournal, EventKind, FrameRecord};
use crate::tracker::{FrameUpdate, PresenceTracker, SessionCounters, SessionStats};
use crate::{config::TrackingSettings, Detection};

/// Drives the tracker and feeds the journal. Owned by exactly one thread; the
/// surrounding system must not call `process` concurrently.
///
/// Journal writes are synchronous on the frame path. That mirrors the inline
/// writes of the system this replaces and is acceptable at feeder frame
/// rates; a sink that can stall for long would need a bounded queue in front
/// of it.
pub struct FramePipeline {
    tracker: PresenceTracker,
    counters: SessionCounters,
    policy: EmissionPolicy,
}

impl FramePipeline {
    pub fn new(settings: &TrackingSettings, policy: EmissionPolicy) -> Self {
        Self {
            tracker: PresenceTracker::new(settings),
            counters: SessionCounters::new(),
            policy,
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.stats()
    }

    /// Process one frame. Detections are assumed already filtered upstream.
    /// `now` must be non-decreasing across calls.
    ///
    /// Journal failures are logged and swallowed here: the in-memory counters
    /// stay authoritative whether or not the sink is reachable, and a bad
    /// sink must never take down the detection path.
    pub fn process(
        &mut self,
        detections: &[Detection],
        now: f64,
        journal: &mut dyn EventJournal,
    ) -> FrameUpdate {
        let update = self.tracker.update(detections, now);
        self.counters.observe(&self.tracker);
        let stats = self.counters.stats();

        if self
            .policy
            .should_write_record(update.frame_count, update.visit_started)
        {
            let record = FrameRecord {
                timestamp: now,
                frame_count: update.frame_count,
                active_count: stats.current_active,
                total_unique: stats.total_unique,
                total_visits: stats.total_visits,
                detections: detections.to_vec(),
            };
            if let Err(e) = journal.write_record(&record) {
                log::warn!("journal record write failed: {}", e);
            }
        }

        let changes = self.counters.take_changes();
        if let Some(total_visits) = changes.visits {
            let event = CounterEvent {
                kind: EventKind::Visit,
                counter_value: total_visits,
                timestamp: now,
            };
            if let Err(e) = journal.write_event(&event) {
                log::warn!("journal event write failed: {}", e);
            }
        }
        if let Some(total_unique) = changes.uniques {
            let event = CounterEvent {
                kind: EventKind::NewUnique,
                counter_value: total_unique,
                timestamp: now,
            };
            if let Err(e) = journal.write_event(&event) {
                log::warn!("journal event write failed: {}", e);
            }
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{InMemoryJournal, TemperatureSample};
    use anyhow::anyhow;

    fn bird() -> Detection {
        Detection {
            label: "bird".to_string(),
            confidence: 0.9,
            x: 0.4,
            y: 0.4,
            width: 0.1,
            height: 0.1,
        }
    }

    fn settings() -> TrackingSettings {
        TrackingSettings::default()
    }

    #[test]
    fn emits_one_event_per_transition() {
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::All);
        let mut journal = InMemoryJournal::new();

        pipeline.process(&[bird()], 0.0, &mut journal);

        // First frame: one visit event and one new-unique event.
        assert_eq!(journal.events().len(), 2);
        assert_eq!(journal.events()[0].kind, EventKind::Visit);
        assert_eq!(journal.events()[1].kind, EventKind::NewUnique);

        // Continued presence: no further events.
        pipeline.process(&[bird()], 1.0, &mut journal);
        assert_eq!(journal.events().len(), 2);
    }

    #[test]
    fn policy_all_records_every_detection_frame() {
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::All);
        let mut journal = InMemoryJournal::new();

        pipeline.process(&[bird()], 0.0, &mut journal);
        pipeline.process(&[bird()], 1.0, &mut journal);
        pipeline.process(&[], 2.0, &mut journal);

        assert_eq!(journal.records().len(), 2);
    }

    #[test]
    fn policy_changes_only_records_visit_frames() {
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::ChangesOnly);
        let mut journal = InMemoryJournal::new();

        pipeline.process(&[bird()], 0.0, &mut journal); // visit starts
        pipeline.process(&[bird()], 1.0, &mut journal); // continuation
        pipeline.process(&[bird(), bird()], 2.0, &mut journal); // group growth

        assert_eq!(journal.records().len(), 2);
        assert_eq!(journal.records()[1].frame_count, 2);
    }

    #[test]
    fn record_carries_consistent_snapshot() {
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::All);
        let mut journal = InMemoryJournal::new();

        pipeline.process(&[bird()], 0.0, &mut journal);

        let record = &journal.records()[0];
        assert_eq!(record.frame_count, 1);
        assert_eq!(record.active_count, 1);
        assert_eq!(record.total_unique, 1);
        assert_eq!(record.total_visits, 1);
        assert_eq!(record.detections.len(), 1);
    }

    struct FailingJournal;

    impl EventJournal for FailingJournal {
        fn write_record(&mut self, _: &FrameRecord) -> anyhow::Result<()> {
            Err(anyhow!("disk gone"))
        }
        fn write_event(&mut self, _: &CounterEvent) -> anyhow::Result<()> {
            Err(anyhow!("disk gone"))
        }
        fn write_temperature(&mut self, _: &TemperatureSample) -> anyhow::Result<()> {
            Err(anyhow!("disk gone"))
        }
    }

    #[test]
    fn sink_failure_leaves_counters_authoritative() {
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::All);
        let mut journal = FailingJournal;

        pipeline.process(&[bird()], 0.0, &mut journal);
        pipeline.process(&[bird(), bird()], 1.0, &mut journal);

        let stats = pipeline.stats();
        assert_eq!(stats.total_unique, 1);
        assert_eq!(stats.total_visits, 2);
    }

    #[test]
    fn end_to_end_session_scenario() {
        // Timeout 30s, visit gap 10s. Absence is stamped when the empty
        // frame arrives (t=20), so the reappearance at t=35 is 15s later and
        // starts a second visit, while the slot refreshed at t=6 is still
        // inside its 30s window at t=35 and no second unique is promoted.
        let mut pipeline = FramePipeline::new(&settings(), EmissionPolicy::All);
        let mut journal = InMemoryJournal::new();

        let frames: &[(usize, f64)] = &[(0, 0.0), (1, 5.0), (1, 6.0), (0, 20.0), (1, 35.0)];
        for &(count, at) in frames {
            let detections: Vec<Detection> = (0..count).map(|_| bird()).collect();
            pipeline.process(&detections, at, &mut journal);
        }

        let stats = pipeline.stats();
        assert_eq!(stats.total_unique, 1);
        assert_eq!(stats.total_visits, 2);

        let visit_events: Vec<_> = journal
            .events()
            .iter()
            .filter(|ev| ev.kind == EventKind::Visit)
            .collect();
        assert_eq!(visit_events.len(), 2);
        assert_eq!(visit_events[1].counter_value, 2);
        assert_eq!(visit_events[1].timestamp, 35.0);
    }
}
