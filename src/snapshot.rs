//! Throttled photo saving. The gate decides when a frame is worth keeping;
//! the sink owns where the bytes land. Every saved photo gets a
//! session-unique sequence number so no two share a name.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::config::FrameSavingSettings;

/// Decides whether the current frame should be saved: photo saving enabled,
/// at least one detection, and the minimum interval elapsed since the last
/// save.
#[derive(Debug)]
pub struct SnapshotGate {
    enabled: bool,
    min_interval: f64,
    last_save_time: Option<f64>,
    photo_count: u64,
}

impl SnapshotGate {
    pub fn new(settings: &FrameSavingSettings) -> Self {
        Self {
            enabled: settings.enable_photo_save,
            min_interval: settings.min_save_interval_seconds,
            last_save_time: None,
            photo_count: 0,
        }
    }

    pub fn photo_count(&self) -> u64 {
        self.photo_count
    }

    /// If the frame qualifies, claims a sequence number and arms the
    /// interval. The caller must then actually hand the frame to a sink;
    /// a failed sink write still consumes the number, keeping names unique.
    pub fn admit(&mut self, frame_count: usize, now: f64) -> Option<u64> {
        if !self.enabled || frame_count == 0 {
            return None;
        }
        if let Some(last) = self.last_save_time {
            if now - last < self.min_interval {
                return None;
            }
        }
        self.last_save_time = Some(now);
        self.photo_count += 1;
        Some(self.photo_count)
    }
}

/// Receives admitted frames. Failures are non-fatal to the frame path.
pub trait SnapshotSink {
    fn save(&mut self, seq: u64, timestamp: f64, jpeg: &[u8]) -> Result<PathBuf>;
}

/// Writes JPEGs under `<session>/photos/`.
pub struct FilesystemSnapshotStore {
    photos_dir: PathBuf,
}

impl FilesystemSnapshotStore {
    pub fn new(session_dir: &Path) -> Result<Self> {
        let photos_dir = session_dir.join("photos");
        std::fs::create_dir_all(&photos_dir).map_err(|e| {
            anyhow!(
                "failed to create photos dir {}: {}",
                photos_dir.display(),
                e
            )
        })?;
        Ok(Self { photos_dir })
    }
}

impl SnapshotSink for FilesystemSnapshotStore {
    fn save(&mut self, seq: u64, timestamp: f64, jpeg: &[u8]) -> Result<PathBuf> {
        let path = self
            .photos_dir
            .join(format!("bird_{}_{:04}.jpg", timestamp as u64, seq));
        std::fs::write(&path, jpeg)
            .map_err(|e| anyhow!("failed to write photo {}: {}", path.display(), e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool, interval: f64) -> FrameSavingSettings {
        FrameSavingSettings {
            enable_photo_save: enabled,
            min_save_interval_seconds: interval,
        }
    }

    #[test]
    fn gate_enforces_minimum_interval() {
        let mut gate = SnapshotGate::new(&settings(true, 5.0));
        assert_eq!(gate.admit(1, 0.0), Some(1));
        assert_eq!(gate.admit(1, 2.0), None);
        assert_eq!(gate.admit(1, 5.0), Some(2));
        assert_eq!(gate.photo_count(), 2);
    }

    #[test]
    fn gate_skips_empty_and_disabled_frames() {
        let mut gate = SnapshotGate::new(&settings(true, 5.0));
        assert_eq!(gate.admit(0, 0.0), None);

        let mut disabled = SnapshotGate::new(&settings(false, 5.0));
        assert_eq!(disabled.admit(3, 0.0), None);
    }

    #[test]
    fn sequence_numbers_never_repeat() {
        let mut gate = SnapshotGate::new(&settings(true, 1.0));
        let seqs: Vec<_> = (0..5).filter_map(|i| gate.admit(1, i as f64)).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn store_writes_uniquely_named_files() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = FilesystemSnapshotStore::new(dir.path())?;

        let first = store.save(1, 1700000000.0, b"jpeg-bytes")?;
        let second = store.save(2, 1700000000.0, b"jpeg-bytes")?;
        assert_ne!(first, second, "same timestamp, distinct sequence numbers");
        assert!(first.starts_with(dir.path().join("photos")));
        assert_eq!(std::fs::read(&first)?, b"jpeg-bytes");
        Ok(())
    }
}
