//! Presence tracking: a small set of identity slots with last-seen
//! timestamps, expired after a configurable timeout.

use crate::config::TrackingSettings;
use crate::tracker::VisitDetector;
use crate::Detection;

/// One provisionally-tracked subject. Owned exclusively by the tracker.
#[derive(Debug, Clone, Copy)]
struct IdentitySlot {
    id: u64,
    last_seen: f64,
}

/// Result of feeding one frame to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Raw detection count on this frame.
    pub frame_count: usize,
    /// New unique-subject promotions this frame (0 or 1 under the
    /// single-slot policy).
    pub new_unique: usize,
    /// Whether the visit detector opened a new visit on this frame.
    pub visit_started: bool,
}

/// Tracks which subjects are currently present and how many distinct ones the
/// session has seen. Identity is approximated by slot occupancy: any
/// detections while a slot is live refresh that slot, and a new subject is
/// only promoted when the active set was empty at the start of the frame.
/// Per-detection identity matching is deliberately not attempted.
#[derive(Debug)]
pub struct PresenceTracker {
    enable_tracking: bool,
    bird_timeout: f64,
    slots: Vec<IdentitySlot>,
    total_unique: u64,
    current_on_frame: usize,
    visits: VisitDetector,
}

impl PresenceTracker {
    pub fn new(settings: &TrackingSettings) -> Self {
        Self {
            enable_tracking: settings.enable_tracking,
            bird_timeout: settings.bird_timeout_seconds,
            slots: Vec::new(),
            total_unique: 0,
            current_on_frame: 0,
            visits: VisitDetector::new(
                settings.enable_visit_counter,
                settings.min_time_between_visits_seconds,
            ),
        }
    }

    pub fn total_unique(&self) -> u64 {
        self.total_unique
    }

    pub fn total_visits(&self) -> u64 {
        self.visits.total_visits()
    }

    /// Slots currently held (post-expiry as of the last update).
    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    /// Raw detection count from the last update.
    pub fn current_on_frame(&self) -> usize {
        self.current_on_frame
    }

    /// Feed one frame. `now` must be non-decreasing across calls; that is a
    /// caller precondition, not validated here. An empty detection list is a
    /// no-op aside from visit delegation and slot expiry.
    pub fn update(&mut self, detections: &[Detection], now: f64) -> FrameUpdate {
        let frame_count = detections.len();

        // Visit counting sees the frame before any slot bookkeeping.
        let visit_started = self.visits.update(frame_count, now);

        if !self.enable_tracking {
            self.current_on_frame = frame_count;
            return FrameUpdate {
                frame_count,
                new_unique: 0,
                visit_started,
            };
        }

        self.slots
            .retain(|slot| now - slot.last_seen <= self.bird_timeout);

        let mut new_unique = 0;
        for _detection in detections {
            if self.slots.is_empty() {
                self.total_unique += 1;
                self.slots.push(IdentitySlot {
                    id: self.total_unique,
                    last_seen: now,
                });
                new_unique += 1;
                log::info!("new unique subject #{}", self.total_unique);
            } else {
                // Any presence refreshes the first live slot; see the type
                // docs for the single-slot identity policy.
                self.slots[0].last_seen = now;
            }
        }

        self.current_on_frame = frame_count;
        FrameUpdate {
            frame_count,
            new_unique,
            visit_started,
        }
    }

    /// Identifier of the oldest live slot, if any. Diagnostic only.
    pub fn active_slot_id(&self) -> Option<u64> {
        self.slots.first().map(|slot| slot.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(timeout: f64) -> TrackingSettings {
        TrackingSettings {
            enable_tracking: true,
            bird_timeout_seconds: timeout,
            enable_visit_counter: true,
            min_time_between_visits_seconds: 10.0,
        }
    }

    fn bird() -> Detection {
        Detection {
            label: "bird".to_string(),
            confidence: 0.8,
            x: 0.4,
            y: 0.4,
            width: 0.1,
            height: 0.1,
        }
    }

    #[test]
    fn first_detection_promotes_one_unique() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        let update = tracker.update(&[bird()], 0.0);
        assert_eq!(update.frame_count, 1);
        assert_eq!(update.new_unique, 1);
        assert_eq!(tracker.total_unique(), 1);
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn concurrent_detections_promote_at_most_one() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        let update = tracker.update(&[bird(), bird(), bird()], 0.0);
        assert_eq!(update.frame_count, 3);
        assert_eq!(update.new_unique, 1);
        assert_eq!(tracker.total_unique(), 1);
    }

    #[test]
    fn continued_presence_refreshes_instead_of_promoting() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        tracker.update(&[bird()], 0.0);
        let update = tracker.update(&[bird()], 5.0);
        assert_eq!(update.new_unique, 0);
        assert_eq!(tracker.total_unique(), 1);
        assert_eq!(tracker.active_slot_id(), Some(1));
    }

    #[test]
    fn slot_expires_after_timeout() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        tracker.update(&[bird()], 0.0);
        tracker.update(&[], 30.0);
        assert_eq!(tracker.active_count(), 1, "timeout is strict: 30.0 is not stale");
        tracker.update(&[], 30.1);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn detection_after_expiry_promotes_a_new_unique() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        tracker.update(&[bird()], 0.0);
        let update = tracker.update(&[bird()], 31.0);
        assert_eq!(update.new_unique, 1);
        assert_eq!(tracker.total_unique(), 2);
        assert_eq!(tracker.active_slot_id(), Some(2));
    }

    #[test]
    fn empty_frame_is_idempotent_on_totals() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        tracker.update(&[], 0.0);
        tracker.update(&[], 1.0);
        assert_eq!(tracker.total_unique(), 0);
        assert_eq!(tracker.total_visits(), 0);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn tracking_disabled_still_counts_visits() {
        let mut tracker = PresenceTracker::new(&TrackingSettings {
            enable_tracking: false,
            ..settings(30.0)
        });
        let update = tracker.update(&[bird()], 0.0);
        assert_eq!(update.new_unique, 0);
        assert!(update.visit_started);
        assert_eq!(tracker.total_unique(), 0);
        assert_eq!(tracker.total_visits(), 1);
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn refreshed_slot_outlives_the_timeout_window() {
        let mut tracker = PresenceTracker::new(&settings(30.0));
        tracker.update(&[bird()], 0.0);
        tracker.update(&[bird()], 25.0);
        tracker.update(&[], 50.0);
        // last_seen was refreshed at 25.0, so 50.0 is within the window.
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.total_unique(), 1);
    }
}
