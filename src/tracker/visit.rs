//! Visit detection: deciding when a burst of presence counts as a new
//! feeding visit, debounced against detector flicker.

/// State machine over per-frame subject counts. A "visit" starts on the first
/// appearance of the session, on a re-appearance after a long enough absence,
/// or when the on-frame group grows.
#[derive(Debug)]
pub struct VisitDetector {
    enabled: bool,
    min_time_between_visits: f64,
    last_frame_count: usize,
    last_absence_time: Option<f64>,
    total_visits: u64,
}

impl VisitDetector {
    pub fn new(enabled: bool, min_time_between_visits: f64) -> Self {
        Self {
            enabled,
            min_time_between_visits,
            last_frame_count: 0,
            last_absence_time: None,
            total_visits: 0,
        }
    }

    pub fn total_visits(&self) -> u64 {
        self.total_visits
    }

    /// Feed one frame's subject count. Returns whether a visit started on
    /// this call. `now` must be non-decreasing across calls (caller
    /// precondition, not validated here).
    ///
    /// Counting rules, in the order they are checked:
    /// - count went 0 → nonzero with no prior absence recorded: first visit
    ///   of the session.
    /// - count went 0 → nonzero after an absence of at least the configured
    ///   gap: new visit. A shorter absence is detector flicker and continues
    ///   the previous visit.
    /// - count grew while already nonzero and is above one: an extra subject
    ///   joined, counted as an additional visit. This fires on every step of
    ///   a monotonic increase (1→2→3 counts twice).
    /// - count went nonzero → 0: records the absence time only.
    pub fn update(&mut self, frame_count: usize, now: f64) -> bool {
        if !self.enabled {
            return false;
        }

        let mut visit_started = false;

        if frame_count > 0 {
            if self.last_frame_count == 0 {
                match self.last_absence_time {
                    None => {
                        self.total_visits += 1;
                        visit_started = true;
                        log::info!("first visit of the session (#{})", self.total_visits);
                    }
                    Some(absent_at) => {
                        let gap = now - absent_at;
                        if gap >= self.min_time_between_visits {
                            self.total_visits += 1;
                            visit_started = true;
                            log::info!(
                                "new visit #{} after {:.1}s of absence",
                                self.total_visits,
                                gap
                            );
                        } else {
                            log::debug!(
                                "visit #{} continues (re-appeared after {:.1}s)",
                                self.total_visits,
                                gap
                            );
                        }
                    }
                }
            } else if frame_count > self.last_frame_count && frame_count > 1 {
                self.total_visits += 1;
                visit_started = true;
                log::info!(
                    "group visit #{} ({} subjects on frame)",
                    self.total_visits,
                    frame_count
                );
            }
        } else if self.last_frame_count > 0 {
            self.last_absence_time = Some(now);
            log::debug!("subjects left the frame at {:.1}", now);
        }

        self.last_frame_count = frame_count;
        visit_started
    }
}
