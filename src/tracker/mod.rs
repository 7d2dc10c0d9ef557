mod counters;
mod presence;
mod visit;

pub use counters::{CounterChanges, SessionCounters, SessionStats};
pub use presence::{FrameUpdate, PresenceTracker};
pub use visit::VisitDetector;
