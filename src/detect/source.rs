use anyhow::Result;

use crate::{now_s, Detection};

/// One frame's worth of upstream output: a wall-clock timestamp, the filtered
/// detection list, and optionally the encoded frame for the snapshot sink.
#[derive(Clone, Debug, Default)]
pub struct FrameObservation {
    pub timestamp: f64,
    pub detections: Vec<Detection>,
    pub jpeg: Option<Vec<u8>>,
}

/// Boundary the pipeline consumes. `Ok(None)` means the stream ended.
pub trait DetectionSource {
    fn next_frame(&mut self) -> Result<Option<FrameObservation>>;
}

/// Produces empty frames stamped with the current wall clock. Lets the daemon
/// run end to end with no camera attached.
#[derive(Debug, Default)]
pub struct StubSource;

impl DetectionSource for StubSource {
    fn next_frame(&mut self) -> Result<Option<FrameObservation>> {
        Ok(Some(FrameObservation {
            timestamp: now_s()?,
            detections: Vec::new(),
            jpeg: None,
        }))
    }
}

/// Replays a fixed schedule of `(offset_seconds, detections)` entries against
/// a base timestamp. Used by tests and demo runs.
#[derive(Debug)]
pub struct ScriptedSource {
    base: f64,
    script: std::vec::IntoIter<(f64, Vec<Detection>)>,
}

impl ScriptedSource {
    pub fn new(base: f64, script: Vec<(f64, Vec<Detection>)>) -> Self {
        Self {
            base,
            script: script.into_iter(),
        }
    }

    /// Script anchored at the current wall clock.
    pub fn starting_now(script: Vec<(f64, Vec<Detection>)>) -> Result<Self> {
        Ok(Self::new(now_s()?, script))
    }
}

impl DetectionSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<FrameObservation>> {
        let Some((offset, detections)) = self.script.next() else {
            return Ok(None);
        };
        Ok(Some(FrameObservation {
            timestamp: self.base + offset,
            detections,
            jpeg: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_replays_then_ends() {
        let det = Detection {
            label: "bird".to_string(),
            confidence: 0.8,
            x: 0.2,
            y: 0.2,
            width: 0.1,
            height: 0.1,
        };
        let mut source = ScriptedSource::new(100.0, vec![(0.0, vec![]), (5.0, vec![det])]);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.timestamp, 100.0);
        assert!(first.detections.is_empty());

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.timestamp, 105.0);
        assert_eq!(second.detections.len(), 1);

        assert!(source.next_frame().unwrap().is_none());
    }
}
