use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::detect::engine::InferenceEngine;

/// File extension of model assets inside a bundle.
pub const MODEL_EXTENSION: &str = "onnx";
/// Optional sidecar holding one class name per line.
pub const LABELS_EXTENSION: &str = "labels";

/// Directory of model assets shipped with the host application.
#[derive(Clone, Debug)]
pub struct ModelBundle {
    root: PathBuf,
}

impl ModelBundle {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `<root>/<model_id>.onnx`. A missing asset is an error.
    pub fn locate(&self, model_id: &str) -> Result<PathBuf> {
        if model_id.is_empty()
            || model_id.contains(['/', '\\'])
            || model_id == "."
            || model_id == ".."
        {
            return Err(anyhow!("invalid model identifier '{}'", model_id));
        }
        let path = self.root.join(format!("{model_id}.{MODEL_EXTENSION}"));
        if !path.is_file() {
            return Err(anyhow!("model asset {} not found", path.display()));
        }
        Ok(path)
    }

    /// Class names for a model: the sidecar file if present, otherwise COCO-80.
    pub fn labels(&self, model_id: &str) -> Result<Vec<String>> {
        let path = self.root.join(format!("{model_id}.{LABELS_EXTENSION}"));
        if !path.exists() {
            return Ok(COCO_LABELS.iter().map(|l| l.to_string()).collect());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read labels file {}", path.display()))?;
        let labels: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if labels.is_empty() {
            return Err(anyhow!("labels file {} is empty", path.display()));
        }
        Ok(labels)
    }

    /// Open a model with the inference engine compiled into this build.
    #[cfg(feature = "backend-tract")]
    pub fn open_engine(&self, model_id: &str) -> Result<Box<dyn InferenceEngine>> {
        let path = self.locate(model_id)?;
        let labels = self.labels(model_id)?;
        let engine = crate::detect::backends::TractEngine::load(path, labels)?;
        Ok(Box::new(engine))
    }

    /// Open a model with the inference engine compiled into this build.
    #[cfg(not(feature = "backend-tract"))]
    pub fn open_engine(&self, model_id: &str) -> Result<Box<dyn InferenceEngine>> {
        let path = self.locate(model_id)?;
        Err(anyhow!(
            "no inference backend compiled in for {} (enable the backend-tract feature)",
            path.display()
        ))
    }
}

/// COCO-80 class names in model output order.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
