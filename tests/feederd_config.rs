use std::sync::Mutex;

use tempfile::NamedTempFile;

use feeder_watch::config::SourceKind;
use feeder_watch::{ConsoleOutputMode, FeederdConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FEEDER_CONFIG",
        "FEEDER_CONSOLE_MODE",
        "FEEDER_LOGS_PATH",
        "FEEDER_BIRD_TIMEOUT_SECS",
        "FEEDER_MIN_VISIT_GAP_SECS",
        "FEEDER_TARGET_CLASSES",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [tracking]
        enable_tracking = true
        bird_timeout_seconds = 45.0
        enable_visit_counter = true
        min_time_between_visits_seconds = 20.0

        [logging]
        console_output_mode = "all"
        logs_path = "session_logs"

        [detection]
        target_classes = ["bird", "squirrel"]
        min_confidence = 0.5
        min_bbox_size = 0.001
        max_bbox_size = 0.25

        [frame_saving]
        enable_photo_save = false
        min_save_interval_seconds = 8.0

        [telemetry]
        enable_temperature_log = true
        interval_seconds = 120

        [source]
        kind = "scripted"
        target_fps = 5
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    std::env::set_var("FEEDER_BIRD_TIMEOUT_SECS", "60");
    std::env::set_var("FEEDER_TARGET_CLASSES", "bird, sparrow");

    let cfg = FeederdConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.tracking.bird_timeout_seconds, 60.0, "env wins");
    assert_eq!(cfg.tracking.min_time_between_visits_seconds, 20.0);
    assert_eq!(cfg.console_output_mode, ConsoleOutputMode::All);
    assert_eq!(cfg.logs_path, std::path::PathBuf::from("session_logs"));
    assert_eq!(cfg.detection.target_classes, vec!["bird", "sparrow"]);
    assert_eq!(cfg.detection.min_confidence, 0.5);
    assert!(!cfg.frame_saving.enable_photo_save);
    assert_eq!(cfg.telemetry.interval_seconds, 120);
    assert_eq!(cfg.source.kind, SourceKind::Scripted);
    assert_eq!(cfg.source.target_fps, 5);

    clear_env();
}

#[test]
fn defaults_apply_without_a_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = FeederdConfig::load_from(None).expect("defaults");

    assert!(cfg.tracking.enable_tracking);
    assert_eq!(cfg.tracking.bird_timeout_seconds, 30.0);
    assert!(cfg.tracking.enable_visit_counter);
    assert_eq!(cfg.tracking.min_time_between_visits_seconds, 10.0);
    assert_eq!(cfg.console_output_mode, ConsoleOutputMode::Minimal);
    assert_eq!(cfg.detection.target_classes, vec!["bird"]);
    assert_eq!(cfg.source.kind, SourceKind::Stub);

    clear_env();
}

#[test]
fn rejects_invalid_tuning_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [tracking]
        bird_timeout_seconds = 0.0
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    assert!(FeederdConfig::load_from(Some(file.path())).is_err());

    clear_env();
}

#[test]
fn rejects_unknown_console_mode() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [logging]
        console_output_mode = "verbose"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    assert!(FeederdConfig::load_from(Some(file.path())).is_err());

    clear_env();
}

#[test]
fn rejects_inverted_bbox_bounds() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [detection]
        min_bbox_size = 0.5
        max_bbox_size = 0.1
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    assert!(FeederdConfig::load_from(Some(file.path())).is_err());

    clear_env();
}
