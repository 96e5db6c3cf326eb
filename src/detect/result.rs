use std::sync::Arc;

use crate::error::GeometryError;
use crate::geometry::NormalizedRect;

/// One filtered detection. Immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    label: String,
    confidence: f32,
    rect: NormalizedRect,
}

impl Detection {
    /// Validate and build a detection record.
    pub fn new<L: Into<String>>(
        label: L,
        confidence: f32,
        rect: NormalizedRect,
    ) -> Result<Self, GeometryError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(GeometryError::EmptyLabel);
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(GeometryError::InvalidConfidence(confidence));
        }
        Ok(Self {
            label,
            confidence,
            rect,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Box in detector-space convention (bottom-left origin).
    pub fn rect(&self) -> NormalizedRect {
        self.rect
    }

    /// Badge text, e.g. `person 87%`.
    pub fn badge_text(&self) -> String {
        format!("{} {}%", self.label, (self.confidence * 100.0).round() as u32)
    }
}

/// All detections for one frame, in engine output order.
///
/// Cloning shares the underlying records; a batch is never edited in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionBatch {
    detections: Arc<[Detection]>,
}

impl DetectionBatch {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections: detections.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.detections
    }

    /// Number of batch values sharing these records.
    #[cfg(test)]
    pub(crate) fn share_count(&self) -> usize {
        Arc::strong_count(&self.detections)
    }
}

impl From<Vec<Detection>> for DetectionBatch {
    fn from(detections: Vec<Detection>) -> Self {
        Self::new(detections)
    }
}

impl<'a> IntoIterator for &'a DetectionBatch {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
