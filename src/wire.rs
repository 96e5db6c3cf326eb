//! Pipeline boundary: records exchanged with the streaming collaborator and
//! the rendering shell.
//!
//! Geometry crosses this boundary only as the serialized rect string; inside
//! the crate it is always a [`NormalizedRect`].

use serde::{Deserialize, Serialize};

use crate::detect::{Detection, DetectionBatch, Detector};
use crate::error::{GeometryError, PipelineError};
use crate::frame::{PixelBufferBuilder, RawFrame};
use crate::geometry::NormalizedRect;

/// Boundary form of a detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireDetection {
    pub label: String,
    pub score: f32,
    /// Normalized, bottom-left-origin rect as `{{x, y}, {w, h}}`.
    pub rect: String,
}

impl From<&Detection> for WireDetection {
    fn from(detection: &Detection) -> Self {
        Self {
            label: detection.label().to_string(),
            score: detection.confidence(),
            rect: detection.rect().encode(),
        }
    }
}

impl TryFrom<&WireDetection> for Detection {
    type Error = GeometryError;

    fn try_from(record: &WireDetection) -> Result<Self, Self::Error> {
        let rect = NormalizedRect::decode(&record.rect)?;
        Detection::new(record.label.clone(), record.score, rect)
    }
}

impl DetectionBatch {
    pub fn to_wire(&self) -> Vec<WireDetection> {
        self.iter().map(WireDetection::from).collect()
    }

    /// Parse boundary records, skipping (and logging) any that fail validation.
    pub fn from_wire(records: &[WireDetection]) -> Self {
        records
            .iter()
            .filter_map(|record| match Detection::try_from(record) {
                Ok(detection) => Some(detection),
                Err(err) => {
                    log::warn!("skipping detection record '{}': {}", record.label, err);
                    None
                }
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Frame ingestion entry point: raw frame in, filtered detections out.
pub struct FramePipeline {
    builder: PixelBufferBuilder,
    detector: Detector,
}

impl FramePipeline {
    pub fn new(detector: Detector) -> Self {
        Self {
            builder: PixelBufferBuilder::new(),
            detector,
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Build the engine image and run detection, reporting failures.
    pub fn try_process(&mut self, frame: &RawFrame<'_>) -> Result<DetectionBatch, PipelineError> {
        let image = self.builder.build_frame(frame)?;
        self.detector.try_detect(image)
    }

    /// Like [`FramePipeline::try_process`], but any failure yields an empty batch.
    pub fn process(&mut self, frame: &RawFrame<'_>) -> DetectionBatch {
        match self.try_process(frame) {
            Ok(batch) => batch,
            Err(err @ PipelineError::ModelLoad { .. }) => {
                log::debug!("frame skipped: {}", err);
                DetectionBatch::empty()
            }
            Err(err) => {
                log::warn!("frame skipped: {}", err);
                DetectionBatch::empty()
            }
        }
    }

    /// Boundary API for the streaming collaborator. Never fails.
    pub fn detect(
        &mut self,
        raw_bytes: &[u8],
        width: u32,
        height: u32,
        row_stride: usize,
    ) -> Vec<WireDetection> {
        self.process(&RawFrame::rgba(raw_bytes, width, height, row_stride))
            .to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ClassLabel, DetectorConfig, Observation, ScriptedEngine};

    fn person(confidence: f32, x: f32, y: f32) -> Observation {
        Observation {
            confidence,
            labels: vec![ClassLabel::new("person", confidence)],
            x,
            y,
            w: 0.25,
            h: 0.5,
        }
    }

    #[test]
    fn wire_record_round_trips_through_detection() {
        let rect = NormalizedRect::new(0.1, 0.2, 0.3, 0.4).unwrap();
        let detection = Detection::new("person", 0.75, rect).unwrap();
        let record = WireDetection::from(&detection);
        assert_eq!(record.rect, "{{0.1, 0.2}, {0.3, 0.4}}");
        assert_eq!(Detection::try_from(&record).unwrap(), detection);
    }

    #[test]
    fn from_wire_skips_malformed_records() {
        let records = vec![
            WireDetection {
                label: "person".into(),
                score: 0.8,
                rect: "{{0.1, 0.2}, {0.3, 0.4}}".into(),
            },
            WireDetection {
                label: "person".into(),
                score: 0.8,
                rect: "garbage".into(),
            },
            WireDetection {
                label: "person".into(),
                score: 7.0,
                rect: "{{0.1, 0.2}, {0.3, 0.4}}".into(),
            },
        ];
        assert_eq!(DetectionBatch::from_wire(&records).len(), 1);
    }

    #[test]
    fn detect_returns_wire_records_in_engine_order() {
        let engine = ScriptedEngine::new().then_observations(vec![
            person(0.5, 0.5, 0.25),
            person(0.2, 0.0, 0.0),
            person(0.9, 0.0, 0.5),
        ]);
        let mut pipeline =
            FramePipeline::new(Detector::with_engine(DetectorConfig::default(), engine));

        let bytes = vec![0u8; 4 * 4 * 4];
        let records = pipeline.detect(&bytes, 4, 4, 16);
        let rects: Vec<&str> = records.iter().map(|r| r.rect.as_str()).collect();
        assert_eq!(
            rects,
            vec!["{{0.5, 0.25}, {0.25, 0.5}}", "{{0, 0.5}, {0.25, 0.5}}"]
        );
        assert_eq!(records[1].score, 0.9);
    }

    #[test]
    fn malformed_frame_yields_no_records() {
        let engine = ScriptedEngine::new().then_observations(vec![person(0.9, 0.0, 0.0)]);
        let mut pipeline =
            FramePipeline::new(Detector::with_engine(DetectorConfig::default(), engine));

        let bytes = vec![0u8; 10];
        assert!(pipeline.detect(&bytes, 4, 4, 16).is_empty());
        let err = pipeline
            .try_process(&RawFrame::rgba(&bytes, 4, 4, 12))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }
}
