use crate::tracker::PresenceTracker;

/// Read-only snapshot of the session totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub total_unique: u64,
    pub total_visits: u64,
    pub current_active: usize,
    pub current_on_frame: usize,
}

/// Which totals moved since the last check, carrying the new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterChanges {
    pub visits: Option<u64>,
    pub uniques: Option<u64>,
}

impl CounterChanges {
    pub fn is_empty(&self) -> bool {
        self.visits.is_none() && self.uniques.is_none()
    }
}

/// Aggregates the tracker's totals and answers the edge-triggered "did
/// anything change since I last asked" query that drives event emission.
#[derive(Debug, Default)]
pub struct SessionCounters {
    current: SessionStats,
    checked: SessionStats,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh the current snapshot from the tracker. Totals only ever grow;
    /// a frame with no detections leaves them unchanged.
    pub fn observe(&mut self, tracker: &PresenceTracker) {
        self.current = SessionStats {
            total_unique: tracker.total_unique(),
            total_visits: tracker.total_visits(),
            current_active: tracker.active_count(),
            current_on_frame: tracker.current_on_frame(),
        };
    }

    pub fn stats(&self) -> SessionStats {
        self.current
    }

    /// Consuming change query: reports which totals increased since the
    /// previous call and stores the current snapshot as the new baseline.
    /// Calling twice in a row with no intervening `observe` reports nothing
    /// the second time.
    pub fn take_changes(&mut self) -> CounterChanges {
        let changes = CounterChanges {
            visits: (self.current.total_visits > self.checked.total_visits)
                .then_some(self.current.total_visits),
            uniques: (self.current.total_unique > self.checked.total_unique)
                .then_some(self.current.total_unique),
        };
        self.checked = self.current;
        changes
    }

    /// Boolean form of [`take_changes`](Self::take_changes). Equally
    /// consuming: an immediately repeated call returns false.
    pub fn has_changed_since_last_check(&mut self) -> bool {
        !self.take_changes().is_empty()
    }
}
