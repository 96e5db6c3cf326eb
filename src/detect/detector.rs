use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};

use crate::detect::bundle::ModelBundle;
use crate::detect::engine::{InferenceEngine, Observation, ScaleMode};
use crate::detect::result::{Detection, DetectionBatch};
use crate::error::PipelineError;
use crate::frame::ImageHandle;
use crate::geometry::NormalizedRect;

pub const DEFAULT_MODEL: &str = "yolo11n";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.35;
pub const DEFAULT_TARGET_LABEL: &str = "person";

/// Detector settings, fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Model asset identifier.
    pub model: String,
    /// Observations below this confidence are discarded.
    pub confidence_threshold: f32,
    /// Only observations whose best label matches this (case-insensitive) survive.
    pub target_label: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            target_label: DEFAULT_TARGET_LABEL.to_string(),
        }
    }
}

enum EngineState {
    Ready(Box<dyn InferenceEngine>),
    Disabled(PipelineError),
}

/// Runs inference and filters raw observations into a detection batch.
///
/// If the model fails to load, the detector is disabled for its lifetime and
/// every call yields an empty batch. There is no retry.
pub struct Detector {
    config: DetectorConfig,
    target_label: String,
    state: EngineState,
}

impl Detector {
    /// Load the configured model with `loader`, then warm it up.
    ///
    /// Load failures are logged and leave the detector disabled.
    pub fn load<F, E>(config: DetectorConfig, loader: F) -> Self
    where
        F: FnOnce(&str) -> Result<E>,
        E: InferenceEngine + 'static,
    {
        let state = match loader(&config.model).and_then(|mut engine| {
            engine.warm_up()?;
            Ok(engine)
        }) {
            Ok(engine) => {
                log::info!(
                    "detector: model '{}' loaded on {} engine",
                    config.model,
                    engine.name()
                );
                EngineState::Ready(Box::new(engine))
            }
            Err(err) => {
                let err = PipelineError::model_load(&config.model, format!("{err:#}"));
                log::error!("detector disabled: {}", err);
                EngineState::Disabled(err)
            }
        };
        Self::with_state(config, state)
    }

    /// Load the configured model from a bundle using the compiled-in engine.
    pub fn from_bundle(config: DetectorConfig, bundle: &ModelBundle) -> Self {
        Self::load(config, |model| bundle.open_engine(model))
    }

    /// Wrap an already-loaded engine.
    pub fn with_engine<E: InferenceEngine + 'static>(config: DetectorConfig, engine: E) -> Self {
        Self::with_state(config, EngineState::Ready(Box::new(engine)))
    }

    fn with_state(config: DetectorConfig, state: EngineState) -> Self {
        let target_label = config.target_label.trim().to_lowercase();
        Self {
            config,
            target_label,
            state,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// The load failure that disabled this detector, if any.
    pub fn load_error(&self) -> Option<&PipelineError> {
        match &self.state {
            EngineState::Disabled(err) => Some(err),
            EngineState::Ready(_) => None,
        }
    }

    /// Run detection, logging failures and returning an empty batch on error.
    pub fn detect(&mut self, image: ImageHandle) -> DetectionBatch {
        match self.try_detect(image) {
            Ok(batch) => batch,
            Err(err @ PipelineError::ModelLoad { .. }) => {
                log::debug!("detector: skipping frame, {}", err);
                DetectionBatch::empty()
            }
            Err(err) => {
                log::warn!("detector: {}", err);
                DetectionBatch::empty()
            }
        }
    }

    /// Run detection and report failures to the caller.
    ///
    /// The image handle is consumed and released before returning, whatever
    /// the outcome.
    pub fn try_detect(&mut self, image: ImageHandle) -> Result<DetectionBatch, PipelineError> {
        let engine = match &mut self.state {
            EngineState::Ready(engine) => engine,
            EngineState::Disabled(err) => return Err(replay_load_error(err)),
        };

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| engine.infer(&image, ScaleMode::Fit)));
        drop(image);
        let observations = match outcome {
            Ok(result) => result.map_err(PipelineError::Inference)?,
            Err(payload) => {
                return Err(PipelineError::Inference(anyhow!(
                    "{} engine panicked: {}",
                    engine.name(),
                    panic_message(payload.as_ref())
                )));
            }
        };

        Ok(self.filter(observations))
    }

    /// Apply threshold and label filtering, preserving engine order.
    pub fn filter(&self, observations: Vec<Observation>) -> DetectionBatch {
        observations
            .into_iter()
            .filter_map(|obs| self.accept(obs))
            .collect::<Vec<_>>()
            .into()
    }

    fn accept(&self, obs: Observation) -> Option<Detection> {
        if obs.confidence.is_nan() || obs.confidence < self.config.confidence_threshold {
            return None;
        }
        let label = obs.best_label()?;
        if label.identifier.to_lowercase() != self.target_label {
            return None;
        }

        let detection = NormalizedRect::new(obs.x, obs.y, obs.w, obs.h)
            .and_then(|rect| Detection::new(label.identifier.clone(), obs.confidence, rect));
        match detection {
            Ok(detection) => Some(detection),
            Err(err) => {
                log::debug!("detector: dropping out-of-contract observation: {}", err);
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn replay_load_error(err: &PipelineError) -> PipelineError {
    match err {
        PipelineError::ModelLoad { model, reason } => PipelineError::ModelLoad {
            model: model.clone(),
            reason: reason.clone(),
        },
        other => PipelineError::model_load("unknown", other),
    }
}
