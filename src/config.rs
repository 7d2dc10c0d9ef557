use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_BIRD_TIMEOUT_S: f64 = 30.0;
const DEFAULT_MIN_VISIT_GAP_S: f64 = 10.0;
const DEFAULT_LOGS_PATH: &str = "logs";
const DEFAULT_TARGET_CLASS: &str = "bird";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;
const DEFAULT_MIN_BBOX_SIZE: f32 = 0.0;
const DEFAULT_MAX_BBOX_SIZE: f32 = 1.0;
const DEFAULT_SAVE_INTERVAL_S: f64 = 5.0;
const DEFAULT_TELEMETRY_INTERVAL_S: u64 = 300;
const DEFAULT_TARGET_FPS: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct FeederdConfigFile {
    tracking: Option<TrackingConfigFile>,
    logging: Option<LoggingConfigFile>,
    detection: Option<DetectionConfigFile>,
    frame_saving: Option<FrameSavingConfigFile>,
    telemetry: Option<TelemetryConfigFile>,
    source: Option<SourceConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingConfigFile {
    enable_tracking: Option<bool>,
    bird_timeout_seconds: Option<f64>,
    enable_visit_counter: Option<bool>,
    min_time_between_visits_seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingConfigFile {
    console_output_mode: Option<String>,
    logs_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    target_classes: Option<Vec<String>>,
    min_confidence: Option<f32>,
    min_bbox_size: Option<f32>,
    max_bbox_size: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameSavingConfigFile {
    enable_photo_save: Option<bool>,
    min_save_interval_seconds: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct TelemetryConfigFile {
    enable_temperature_log: Option<bool>,
    interval_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    kind: Option<String>,
    target_fps: Option<u32>,
}

/// Which console output the daemon produces. Controls printing only, never
/// the counting state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsoleOutputMode {
    All,
    ChangesOnly,
    Minimal,
}

impl ConsoleOutputMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "all" => Ok(Self::All),
            "changes_only" => Ok(Self::ChangesOnly),
            "minimal" => Ok(Self::Minimal),
            other => Err(anyhow!(
                "console_output_mode must be all, changes_only, or minimal (got {:?})",
                other
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Stub,
    Scripted,
}

impl SourceKind {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "stub" => Ok(Self::Stub),
            "scripted" => Ok(Self::Scripted),
            other => Err(anyhow!("source kind must be stub or scripted (got {:?})", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeederdConfig {
    pub tracking: TrackingSettings,
    pub console_output_mode: ConsoleOutputMode,
    pub logs_path: PathBuf,
    pub detection: DetectionSettings,
    pub frame_saving: FrameSavingSettings,
    pub telemetry: TelemetrySettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct TrackingSettings {
    pub enable_tracking: bool,
    pub bird_timeout_seconds: f64,
    pub enable_visit_counter: bool,
    pub min_time_between_visits_seconds: f64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            enable_tracking: true,
            bird_timeout_seconds: DEFAULT_BIRD_TIMEOUT_S,
            enable_visit_counter: true,
            min_time_between_visits_seconds: DEFAULT_MIN_VISIT_GAP_S,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub target_classes: Vec<String>,
    pub min_confidence: f32,
    pub min_bbox_size: f32,
    pub max_bbox_size: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameSavingSettings {
    pub enable_photo_save: bool,
    pub min_save_interval_seconds: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TelemetrySettings {
    pub enable_temperature_log: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct SourceSettings {
    pub kind: SourceKind,
    pub target_fps: u32,
}

impl FeederdConfig {
    /// Load from the file named by `FEEDER_CONFIG` (if set), apply `FEEDER_*`
    /// environment overrides, and validate. Invalid tuning values are fatal
    /// here, at startup, never at frame time.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FEEDER_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => FeederdConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FeederdConfigFile) -> Result<Self> {
        let tracking_file = file.tracking.unwrap_or_default();
        let tracking = TrackingSettings {
            enable_tracking: tracking_file.enable_tracking.unwrap_or(true),
            bird_timeout_seconds: tracking_file
                .bird_timeout_seconds
                .unwrap_or(DEFAULT_BIRD_TIMEOUT_S),
            enable_visit_counter: tracking_file.enable_visit_counter.unwrap_or(true),
            min_time_between_visits_seconds: tracking_file
                .min_time_between_visits_seconds
                .unwrap_or(DEFAULT_MIN_VISIT_GAP_S),
        };

        let logging = file.logging.unwrap_or_default();
        let console_output_mode = match logging.console_output_mode.as_deref() {
            Some(mode) => ConsoleOutputMode::parse(mode)?,
            None => ConsoleOutputMode::Minimal,
        };
        let logs_path = logging
            .logs_path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOGS_PATH));

        let detection_file = file.detection.unwrap_or_default();
        let detection = DetectionSettings {
            target_classes: detection_file
                .target_classes
                .unwrap_or_else(|| vec![DEFAULT_TARGET_CLASS.to_string()]),
            min_confidence: detection_file
                .min_confidence
                .unwrap_or(DEFAULT_MIN_CONFIDENCE),
            min_bbox_size: detection_file.min_bbox_size.unwrap_or(DEFAULT_MIN_BBOX_SIZE),
            max_bbox_size: detection_file.max_bbox_size.unwrap_or(DEFAULT_MAX_BBOX_SIZE),
        };

        let saving_file = file.frame_saving.unwrap_or_default();
        let frame_saving = FrameSavingSettings {
            enable_photo_save: saving_file.enable_photo_save.unwrap_or(true),
            min_save_interval_seconds: saving_file
                .min_save_interval_seconds
                .unwrap_or(DEFAULT_SAVE_INTERVAL_S),
        };

        let telemetry_file = file.telemetry.unwrap_or_default();
        let telemetry = TelemetrySettings {
            enable_temperature_log: telemetry_file.enable_temperature_log.unwrap_or(true),
            interval_seconds: telemetry_file
                .interval_seconds
                .unwrap_or(DEFAULT_TELEMETRY_INTERVAL_S),
        };

        let source_file = file.source.unwrap_or_default();
        let source = SourceSettings {
            kind: match source_file.kind.as_deref() {
                Some(kind) => SourceKind::parse(kind)?,
                None => SourceKind::Stub,
            },
            target_fps: source_file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
        };

        Ok(Self {
            tracking,
            console_output_mode,
            logs_path,
            detection,
            frame_saving,
            telemetry,
            source,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(mode) = std::env::var("FEEDER_CONSOLE_MODE") {
            if !mode.trim().is_empty() {
                self.console_output_mode = ConsoleOutputMode::parse(mode.trim())?;
            }
        }
        if let Ok(path) = std::env::var("FEEDER_LOGS_PATH") {
            if !path.trim().is_empty() {
                self.logs_path = PathBuf::from(path);
            }
        }
        if let Ok(timeout) = std::env::var("FEEDER_BIRD_TIMEOUT_SECS") {
            self.tracking.bird_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("FEEDER_BIRD_TIMEOUT_SECS must be a number of seconds"))?;
        }
        if let Ok(gap) = std::env::var("FEEDER_MIN_VISIT_GAP_SECS") {
            self.tracking.min_time_between_visits_seconds = gap
                .parse()
                .map_err(|_| anyhow!("FEEDER_MIN_VISIT_GAP_SECS must be a number of seconds"))?;
        }
        if let Ok(classes) = std::env::var("FEEDER_TARGET_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.detection.target_classes = parsed;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.tracking.bird_timeout_seconds <= 0.0 {
            return Err(anyhow!("bird_timeout_seconds must be greater than zero"));
        }
        if self.tracking.min_time_between_visits_seconds <= 0.0 {
            return Err(anyhow!(
                "min_time_between_visits_seconds must be greater than zero"
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(anyhow!("min_confidence must be within [0, 1]"));
        }
        if self.detection.min_bbox_size > self.detection.max_bbox_size {
            return Err(anyhow!("min_bbox_size must not exceed max_bbox_size"));
        }
        if self.detection.target_classes.is_empty() {
            return Err(anyhow!("target_classes must not be empty"));
        }
        if self.frame_saving.min_save_interval_seconds < 0.0 {
            return Err(anyhow!("min_save_interval_seconds must not be negative"));
        }
        if self.telemetry.interval_seconds == 0 {
            return Err(anyhow!("telemetry interval must be greater than zero"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source target_fps must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FeederdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
