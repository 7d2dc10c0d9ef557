use crate::config::DetectionSettings;
use crate::Detection;

/// Pre-filters raw detector output to the configured target classes,
/// confidence threshold, and bounding-box area range. Runs before the
/// tracker, so the state machine only ever sees subjects it cares about.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    target_classes: Vec<String>,
    min_confidence: f32,
    min_bbox_size: f32,
    max_bbox_size: f32,
}

impl DetectionFilter {
    pub fn new(settings: &DetectionSettings) -> Self {
        Self {
            target_classes: settings.target_classes.clone(),
            min_confidence: settings.min_confidence,
            min_bbox_size: settings.min_bbox_size,
            max_bbox_size: settings.max_bbox_size,
        }
    }

    pub fn accepts(&self, det: &Detection) -> bool {
        if !self.target_classes.iter().any(|class| class == &det.label) {
            return false;
        }
        if det.confidence < self.min_confidence {
            return false;
        }
        let area = det.bbox_area();
        area >= self.min_bbox_size && area <= self.max_bbox_size
    }

    /// Input order is preserved; the tracker's promotion policy depends on it.
    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|det| self.accepts(det))
            .collect()
    }
}
