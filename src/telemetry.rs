//! System health telemetry: CPU temperature probe, FPS meter, and the
//! periodic sampler thread that feeds both into the journal.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::journal::{EventJournal, TemperatureSample};
use crate::now_s;

const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Reads the SoC temperature from the kernel thermal zone (millidegrees
/// Celsius on Raspberry Pi class hardware).
#[derive(Debug, Clone)]
pub struct CpuTemperature {
    path: PathBuf,
}

impl Default for CpuTemperature {
    fn default() -> Self {
        Self {
            path: PathBuf::from(THERMAL_ZONE_PATH),
        }
    }
}

impl CpuTemperature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn read(&self) -> Result<f64> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| anyhow!("failed to read {}: {}", self.path.display(), e))?;
        let millidegrees: f64 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("unexpected thermal zone contents: {:?}", raw.trim()))?;
        Ok(millidegrees / 1000.0)
    }
}

/// Instantaneous FPS from inter-frame deltas, published through an atomic so
/// the sampler thread can read it without touching the frame path.
#[derive(Debug)]
pub struct FpsMeter {
    last_frame_time: Option<f64>,
    shared: Arc<AtomicU64>,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self {
            last_frame_time: None,
            shared: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for readers on other threads.
    pub fn reader(&self) -> FpsReader {
        FpsReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Record a frame arrival; returns the current FPS estimate.
    pub fn tick(&mut self, now: f64) -> f64 {
        let fps = match self.last_frame_time {
            Some(prev) if now > prev => 1.0 / (now - prev),
            _ => 0.0,
        };
        self.last_frame_time = Some(now);
        self.shared.store(fps.to_bits(), Ordering::Relaxed);
        fps
    }

    pub fn current(&self) -> f64 {
        f64::from_bits(self.shared.load(Ordering::Relaxed))
    }
}

/// Read-only view of an [`FpsMeter`] for the telemetry thread.
#[derive(Debug, Clone)]
pub struct FpsReader {
    shared: Arc<AtomicU64>,
}

impl FpsReader {
    pub fn current(&self) -> f64 {
        f64::from_bits(self.shared.load(Ordering::Relaxed))
    }
}

/// Periodic sampler thread: reads the temperature probe and the shared FPS
/// value, writes one `TemperatureSample` per interval, starting with an
/// immediate startup sample. Probe or journal failures log a warning and
/// skip the tick; they never stop the sampler.
pub struct TelemetrySampler {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TelemetrySampler {
    pub fn spawn<J>(
        journal: Arc<Mutex<J>>,
        probe: CpuTemperature,
        fps: FpsReader,
        interval: Duration,
    ) -> Self
    where
        J: EventJournal + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            sample_once(&journal, &probe, &fps);
            while !interruptible_sleep(interval, &stop_flag) {
                sample_once(&journal, &probe, &fps);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TelemetrySampler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Sleep for `interval` in short slices so shutdown stays prompt. Returns
/// true if the stop flag was raised.
fn interruptible_sleep(interval: Duration, stop: &AtomicBool) -> bool {
    let slice = Duration::from_millis(100);
    let mut remaining = interval;
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    stop.load(Ordering::Relaxed)
}

fn sample_once<J: EventJournal>(journal: &Arc<Mutex<J>>, probe: &CpuTemperature, fps: &FpsReader) {
    let celsius = match probe.read() {
        Ok(celsius) => celsius,
        Err(e) => {
            log::warn!("temperature probe failed: {}", e);
            return;
        }
    };
    let timestamp = match now_s() {
        Ok(timestamp) => timestamp,
        Err(e) => {
            log::warn!("clock read failed: {}", e);
            return;
        }
    };
    let current_fps = fps.current();
    let sample = TemperatureSample {
        celsius,
        timestamp,
        fps: (current_fps > 0.0).then_some(current_fps),
    };
    let mut guard = match journal.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(e) = guard.write_temperature(&sample) {
        log::warn!("temperature write failed: {}", e);
    }
}
