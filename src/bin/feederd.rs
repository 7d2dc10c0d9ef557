//! feederd - feeder watch daemon
//!
//! Per frame, this daemon:
//! 1. Pulls a detection list from the configured source
//! 2. Filters it to the configured classes, confidence, and bbox sizes
//! 3. Feeds the presence tracker / visit detector pipeline
//! 4. Writes policy-gated records and counter events to the session journal
//! 5. Saves an occasional photo when the snapshot gate admits the frame
//!
//! A separate sampler thread logs CPU temperature and FPS on an interval.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feeder_watch::config::SourceKind;
use feeder_watch::{
    ConsoleOutputMode, Detection, DetectionFilter, DetectionSource, EmissionPolicy, FeederdConfig,
    FilesystemSnapshotStore, FpsMeter, FramePipeline, ScriptedSource, SnapshotGate, SnapshotSink,
    SqliteJournal, StubSource, TelemetrySampler,
};

const CONSOLE_STATS_EVERY_N_FRAMES: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "feederd", about = "Bird feeder presence tracking daemon")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, env = "FEEDER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the session logs directory.
    #[arg(long)]
    logs_path: Option<PathBuf>,

    /// Stop after this many frames (smoke-test mode).
    #[arg(long)]
    frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = FeederdConfig::load_from(args.config.as_deref())?;
    if let Some(logs_path) = args.logs_path {
        cfg.logs_path = logs_path;
    }

    let started_at = feeder_watch::now_s()?;
    let journal = SqliteJournal::create_session(&cfg.logs_path, started_at)?;
    let session_dir = journal.session_dir().to_path_buf();
    let journal = Arc::new(Mutex::new(journal));

    log::info!("feederd {} starting", env!("CARGO_PKG_VERSION"));
    log::info!("session dir: {}", session_dir.display());
    log::info!(
        "tracking: timeout={}s visit_gap={}s unique={} visits={}",
        cfg.tracking.bird_timeout_seconds,
        cfg.tracking.min_time_between_visits_seconds,
        cfg.tracking.enable_tracking,
        cfg.tracking.enable_visit_counter,
    );
    log::info!(
        "detection: classes={:?} min_confidence={}",
        cfg.detection.target_classes,
        cfg.detection.min_confidence
    );
    log::info!("console mode: {:?}", cfg.console_output_mode);

    {
        let summary = format!(
            "classes={:?} min_confidence={} timeout={}s visit_gap={}s mode={:?} photo_save={}",
            cfg.detection.target_classes,
            cfg.detection.min_confidence,
            cfg.tracking.bird_timeout_seconds,
            cfg.tracking.min_time_between_visits_seconds,
            cfg.console_output_mode,
            cfg.frame_saving.enable_photo_save,
        );
        lock_journal(&journal).record_system_summary(&summary)?;
    }

    let filter = DetectionFilter::new(&cfg.detection);
    let policy = EmissionPolicy::from_console_mode(cfg.console_output_mode);
    let mut pipeline = FramePipeline::new(&cfg.tracking, policy);
    let mut snapshot_gate = SnapshotGate::new(&cfg.frame_saving);
    let mut snapshot_store = FilesystemSnapshotStore::new(&session_dir)?;
    let mut fps_meter = FpsMeter::new();

    let sampler = if cfg.telemetry.enable_temperature_log {
        Some(TelemetrySampler::spawn(
            Arc::clone(&journal),
            feeder_watch::CpuTemperature::new(),
            fps_meter.reader(),
            Duration::from_secs(cfg.telemetry.interval_seconds),
        ))
    } else {
        None
    };

    let mut source = build_source(cfg.source.kind)?;
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(cfg.source.target_fps));

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })
        .map_err(|e| anyhow!("failed to install ctrl-c handler: {}", e))?;
    }

    let mut frame_number = 0u64;
    while !stop.load(Ordering::Relaxed) {
        if let Some(limit) = args.frames {
            if frame_number >= limit {
                break;
            }
        }

        let Some(frame) = source.next_frame()? else {
            log::info!("source ended after {} frames", frame_number);
            break;
        };
        frame_number += 1;

        let detections = filter.apply(frame.detections);
        let fps = fps_meter.tick(frame.timestamp);

        let update = {
            let mut guard = lock_journal(&journal);
            pipeline.process(&detections, frame.timestamp, &mut *guard)
        };

        if let Some(jpeg) = frame.jpeg.as_deref() {
            if let Some(seq) = snapshot_gate.admit(update.frame_count, frame.timestamp) {
                match snapshot_store.save(seq, frame.timestamp, jpeg) {
                    Ok(path) => log::info!("photo #{} saved: {}", seq, path.display()),
                    Err(e) => log::warn!("photo save failed: {}", e),
                }
            }
        }

        let stats = pipeline.stats();
        match cfg.console_output_mode {
            ConsoleOutputMode::All => {
                if frame_number % CONSOLE_STATS_EVERY_N_FRAMES == 0 {
                    log::info!(
                        "frame {} fps={:.1} on_frame={} active={} unique={} visits={}",
                        frame_number,
                        fps,
                        stats.current_on_frame,
                        stats.current_active,
                        stats.total_unique,
                        stats.total_visits
                    );
                }
            }
            ConsoleOutputMode::ChangesOnly => {
                if update.visit_started || update.new_unique > 0 {
                    log::info!(
                        "change: unique={} visits={}",
                        stats.total_unique,
                        stats.total_visits
                    );
                }
            }
            ConsoleOutputMode::Minimal => {}
        }

        std::thread::sleep(frame_interval);
    }

    if let Some(sampler) = sampler {
        sampler.shutdown();
    }

    let stats = pipeline.stats();
    log::info!(
        "session finished: frames={} unique={} visits={} photos={}",
        frame_number,
        stats.total_unique,
        stats.total_visits,
        snapshot_gate.photo_count()
    );
    Ok(())
}

fn build_source(kind: SourceKind) -> Result<Box<dyn DetectionSource>> {
    match kind {
        SourceKind::Stub => Ok(Box::new(StubSource)),
        SourceKind::Scripted => Ok(Box::new(ScriptedSource::starting_now(demo_script())?)),
    }
}

/// A short scripted session for running the daemon without a detector
/// attached: one bird, a gap, then a pair feeding together.
fn demo_script() -> Vec<(f64, Vec<Detection>)> {
    fn bird(x: f32, confidence: f32) -> Detection {
        Detection {
            label: "bird".to_string(),
            confidence,
            x,
            y: 0.5,
            width: 0.12,
            height: 0.10,
        }
    }

    vec![
        (0.0, vec![]),
        (1.0, vec![bird(0.40, 0.85)]),
        (2.0, vec![bird(0.42, 0.80)]),
        (3.0, vec![]),
        (15.0, vec![bird(0.55, 0.90)]),
        (16.0, vec![bird(0.55, 0.88), bird(0.30, 0.75)]),
        (17.0, vec![]),
    ]
}

fn lock_journal(journal: &Arc<Mutex<SqliteJournal>>) -> std::sync::MutexGuard<'_, SqliteJournal> {
    match journal.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
