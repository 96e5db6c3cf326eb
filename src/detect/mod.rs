mod backends;
mod bundle;
mod detector;
mod engine;
mod result;

pub use backends::{ScriptedEngine, StubEngine};
#[cfg(feature = "backend-tract")]
pub use backends::TractEngine;
pub use bundle::{ModelBundle, COCO_LABELS, LABELS_EXTENSION, MODEL_EXTENSION};
pub use detector::{
    Detector, DetectorConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_MODEL, DEFAULT_TARGET_LABEL,
};
pub use engine::{ClassLabel, InferenceEngine, Observation, ScaleMode};
pub use result::{Detection, DetectionBatch};
