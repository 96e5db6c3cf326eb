use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use frame_overlay::OverlayConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "OVERLAY_CONFIG",
        "OVERLAY_MODEL",
        "OVERLAY_MODEL_DIR",
        "OVERLAY_CONFIDENCE_THRESHOLD",
        "OVERLAY_TARGET_LABEL",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = OverlayConfig::load().expect("load config");
    assert_eq!(cfg.model_dir, PathBuf::from("models"));
    assert_eq!(cfg.detector.model, "yolo11n");
    assert_eq!(cfg.detector.confidence_threshold, 0.35);
    assert_eq!(cfg.detector.target_label, "person");
    assert_eq!(cfg.style.stroke_width, 3.0);
    assert_eq!(cfg.style.font_size, 16.0);
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".json",
        r#"{
            "model": "yolo11s",
            "model_dir": "/opt/models",
            "detector": {
                "confidence_threshold": 0.5,
                "target_label": "Car"
            },
            "style": {
                "stroke_width": 2.0,
                "badge_padding_x": 6.0
            }
        }"#,
    );

    std::env::set_var("OVERLAY_CONFIG", file.path());
    std::env::set_var("OVERLAY_CONFIDENCE_THRESHOLD", "0.6");
    std::env::set_var("OVERLAY_MODEL_DIR", "/srv/models");

    let cfg = OverlayConfig::load().expect("load config");
    assert_eq!(cfg.detector.model, "yolo11s");
    assert_eq!(cfg.model_dir, PathBuf::from("/srv/models"));
    assert_eq!(cfg.detector.confidence_threshold, 0.6);
    assert_eq!(cfg.detector.target_label, "car");
    assert_eq!(cfg.style.stroke_width, 2.0);
    assert_eq!(cfg.style.badge_padding_x, 6.0);
    assert_eq!(cfg.style.badge_padding_y, 2.0);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        ".toml",
        r#"
model = "yolo11m"

[detector]
target_label = "traffic light"

[style]
font_size = 20.0
"#,
    );
    std::env::set_var("OVERLAY_CONFIG", file.path());
    std::env::set_var("OVERLAY_MODEL", "custom");

    let cfg = OverlayConfig::load().expect("load config");
    assert_eq!(cfg.detector.model, "custom");
    assert_eq!(cfg.detector.target_label, "traffic light");
    assert_eq!(cfg.style.font_size, 20.0);

    clear_env();
}

#[test]
fn rejects_invalid_settings() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OVERLAY_CONFIDENCE_THRESHOLD", "1.5");
    assert!(OverlayConfig::load().is_err());

    std::env::set_var("OVERLAY_CONFIDENCE_THRESHOLD", "high");
    assert!(OverlayConfig::load().is_err());
    clear_env();

    std::env::set_var("OVERLAY_TARGET_LABEL", "../person");
    assert!(OverlayConfig::load().is_err());
    clear_env();

    let file = config_file(".json", r#"{ "unexpected": true }"#);
    std::env::set_var("OVERLAY_CONFIG", file.path());
    assert!(OverlayConfig::load().is_err());
    clear_env();

    let file = config_file(".json", r#"{ "style": { "font_size": 0.0 } }"#);
    std::env::set_var("OVERLAY_CONFIG", file.path());
    assert!(OverlayConfig::load().is_err());

    clear_env();
}
