//! Failure taxonomy for the frame → detection → overlay pipeline.
//!
//! Every failure is contained at the component that produced it. The
//! structured `try_*` entry points return these errors; the plain entry
//! points log them and fall back to an empty batch.

use thiserror::Error;

/// Failures produced while turning a frame into a detection batch.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The model asset could not be loaded. The detector stays disabled for its lifetime.
    #[error("model '{model}' failed to load: {reason}")]
    ModelLoad { model: String, reason: String },

    /// The engine-native pixel buffer could not be allocated.
    #[error("pixel buffer construction failed: {0}")]
    BufferConstruction(String),

    /// The inference engine reported an error for this frame.
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    /// Width, height, stride or byte length violate the frame preconditions.
    #[error("malformed frame: {0}")]
    MalformedInput(String),
}

impl PipelineError {
    pub fn model_load<M: Into<String>, R: std::fmt::Display>(model: M, reason: R) -> Self {
        Self::ModelLoad {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Self::MalformedInput(msg.into())
    }

    /// True for the failure that permanently disables a detector.
    pub fn is_fatal_to_detector(&self) -> bool {
        matches!(self, Self::ModelLoad { .. })
    }
}

/// Geometry and record validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("malformed rect encoding '{0}'")]
    MalformedRect(String),

    #[error("{field} = {value} is outside the unit range")]
    OutOfRange { field: &'static str, value: f32 },

    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f32),

    #[error("detection label is empty")]
    EmptyLabel,
}
