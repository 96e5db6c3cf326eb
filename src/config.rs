use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::detect::{
    DetectorConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MODEL, DEFAULT_TARGET_LABEL,
};
use crate::overlay::OverlayStyle;

const DEFAULT_MODEL_DIR: &str = "models";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OverlayConfigFile {
    model: Option<String>,
    model_dir: Option<PathBuf>,
    detector: Option<DetectorConfigFile>,
    style: Option<StyleConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    confidence_threshold: Option<f32>,
    target_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct StyleConfigFile {
    stroke_width: Option<f32>,
    font_size: Option<f32>,
    badge_padding_x: Option<f32>,
    badge_padding_y: Option<f32>,
}

/// Settings for the detection overlay.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub model_dir: PathBuf,
    pub detector: DetectorConfig,
    pub style: OverlayStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            detector: DetectorConfig::default(),
            style: OverlayStyle::default(),
        }
    }
}

impl OverlayConfig {
    /// Load from `OVERLAY_CONFIG` (JSON, or TOML by extension), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OVERLAY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: OverlayConfigFile) -> Self {
        let defaults = OverlayStyle::default();
        let detector = file.detector.unwrap_or_default();
        let style = file.style.unwrap_or_default();
        Self {
            model_dir: file
                .model_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR)),
            detector: DetectorConfig {
                model: file.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                target_label: detector
                    .target_label
                    .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
            },
            style: OverlayStyle {
                stroke_width: style.stroke_width.unwrap_or(defaults.stroke_width),
                font_size: style.font_size.unwrap_or(defaults.font_size),
                badge_padding_x: style.badge_padding_x.unwrap_or(defaults.badge_padding_x),
                badge_padding_y: style.badge_padding_y.unwrap_or(defaults.badge_padding_y),
                ..defaults
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(model) = std::env::var("OVERLAY_MODEL") {
            if !model.trim().is_empty() {
                self.detector.model = model.trim().to_string();
            }
        }
        if let Ok(dir) = std::env::var("OVERLAY_MODEL_DIR") {
            if !dir.trim().is_empty() {
                self.model_dir = PathBuf::from(dir);
            }
        }
        if let Ok(label) = std::env::var("OVERLAY_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.detector.target_label = label;
            }
        }
        if let Ok(threshold) = std::env::var("OVERLAY_CONFIDENCE_THRESHOLD") {
            self.detector.confidence_threshold = threshold.trim().parse().map_err(|_| {
                anyhow!("OVERLAY_CONFIDENCE_THRESHOLD must be a number between 0 and 1")
            })?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let threshold = self.detector.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "confidence threshold {} must be within [0, 1]",
                threshold
            ));
        }

        self.detector.target_label = self.detector.target_label.trim().to_lowercase();
        validate_label(&self.detector.target_label)?;

        if self.detector.model.trim().is_empty() {
            return Err(anyhow!("model identifier must not be empty"));
        }

        for (name, value) in [
            ("stroke_width", self.style.stroke_width),
            ("font_size", self.style.font_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(anyhow!("style.{} must be greater than zero", name));
            }
        }
        for (name, value) in [
            ("badge_padding_x", self.style.badge_padding_x),
            ("badge_padding_y", self.style.badge_padding_y),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("style.{} must not be negative", name));
            }
        }
        Ok(())
    }
}

/// Target labels are short lowercase class names, e.g. `person`, `traffic light`.
pub fn validate_label(label: &str) -> Result<()> {
    static LABEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = LABEL_RE.get_or_init(|| {
        regex::Regex::new(r"^[a-z0-9 _-]{1,64}$").expect("label pattern is valid")
    });
    if !re.is_match(label) {
        return Err(anyhow!("invalid target label '{}'", label));
    }
    Ok(())
}

fn read_config_file(path: &Path) -> Result<OverlayConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
