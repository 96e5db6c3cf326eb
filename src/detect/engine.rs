use anyhow::Result;

use crate::frame::ImageHandle;

/// How the engine fits an image to the model's input size.
///
/// The detector always requests `Fit` so boxes cover the full field of view.
/// `Fill` and `CenterCrop` exist for engines driven directly by a host; an
/// engine that cannot honor a mode returns an error from `infer`.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleMode {
    /// Scale to fit, preserving the full field of view (letterbox).
    Fit,
    /// Scale to fill, cropping whichever axis overflows.
    Fill,
    /// Crop the centered square, then scale.
    CenterCrop,
}

/// One classification candidate attached to an observation.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassLabel {
    pub identifier: String,
    pub confidence: f32,
}

impl ClassLabel {
    pub fn new<S: Into<String>>(identifier: S, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// Raw engine output for one object, before filtering.
///
/// The box uses detector-space convention: normalized, origin bottom-left.
/// `labels` are ordered best-first.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub confidence: f32,
    pub labels: Vec<ClassLabel>,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Observation {
    pub fn best_label(&self) -> Option<&ClassLabel> {
        self.labels.first()
    }
}

/// Inference engine seam.
///
/// Implementations must treat the image as read-only and must not retain
/// pixel memory beyond the `infer` call. Calls are never issued concurrently.
pub trait InferenceEngine: Send {
    /// Engine identifier.
    fn name(&self) -> &'static str;

    /// Run the model on one image and return its raw observations in output order.
    fn infer(&mut self, image: &ImageHandle, scale: ScaleMode) -> Result<Vec<Observation>>;

    /// Optional warm-up hook, run once after load.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, image: &ImageHandle, scale: ScaleMode) -> Result<Vec<Observation>> {
        (**self).infer(image, scale)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
