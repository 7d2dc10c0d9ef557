mod filter;
mod source;

pub use filter::DetectionFilter;
pub use source::{DetectionSource, FrameObservation, ScriptedSource, StubSource};

use serde::{Deserialize, Serialize};

/// One detected object on one frame. Transient: not retained beyond the
/// update call that consumed it, except as aggregated counts and journal
/// payloads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
    /// Normalized bounding box, all coordinates in [0, 1].
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Detection {
    /// Normalized bounding-box area, used by the size filter.
    pub fn bbox_area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}
