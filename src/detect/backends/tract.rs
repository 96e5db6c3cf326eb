#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use tract_onnx::prelude::*;

use crate::detect::engine::{ClassLabel, InferenceEngine, Observation, ScaleMode};
use crate::frame::ImageHandle;

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_SCORE_FLOOR: f32 = 0.1;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const LABELS_PER_OBSERVATION: usize = 5;
const LETTERBOX_FILL: u8 = 114;

/// Tract-based engine for YOLO-family ONNX detectors.
///
/// Expects a single `[1, 4 + C, N]` output (center x, center y, width,
/// height in input pixels followed by per-class scores). Suppression of
/// overlapping boxes happens here, per class, before observations leave
/// the engine.
pub struct TractEngine {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    decoder: OutputDecoder,
}

/// Turns the raw detection head output into filtered observations.
#[derive(Clone, Debug)]
struct OutputDecoder {
    labels: Vec<String>,
    score_floor: f32,
    iou_threshold: f32,
}

/// Letterbox placement of the source image inside the square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    src_width: f32,
    src_height: f32,
}

impl TractEngine {
    /// Load an ONNX model from disk and prepare it for square inputs.
    pub fn load<P: AsRef<Path>>(model_path: P, labels: Vec<String>) -> Result<Self> {
        Self::load_with_input_size(model_path, labels, DEFAULT_INPUT_SIZE)
    }

    pub fn load_with_input_size<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        input_size: u32,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("label list is empty"));
        }
        let model_path = model_path.as_ref();
        let size = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            decoder: OutputDecoder {
                labels,
                score_floor: DEFAULT_SCORE_FLOOR,
                iou_threshold: DEFAULT_IOU_THRESHOLD,
            },
        })
    }

    /// Candidates below this class score never become observations.
    pub fn with_score_floor(mut self, floor: f32) -> Self {
        self.decoder.score_floor = floor;
        self
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.decoder.iou_threshold = threshold;
        self
    }

    fn build_input(&self, image: &ImageHandle) -> Result<(Tensor, Placement)> {
        let src_w = image.width();
        let src_h = image.height();
        let rgb = RgbImage::from_fn(src_w, src_h, |x, y| match image.pixel(x, y) {
            Some([b, g, r, _]) => Rgb([r, g, b]),
            None => Rgb([0, 0, 0]),
        });

        let size = self.input_size as f32;
        let scale = (size / src_w as f32).min(size / src_h as f32);
        if !scale.is_finite() || scale <= 0.0 {
            return Err(anyhow!("cannot letterbox {}x{} frame", src_w, src_h));
        }
        let new_w = ((src_w as f32 * scale).round() as u32).clamp(1, self.input_size);
        let new_h = ((src_h as f32 * scale).round() as u32).clamp(1, self.input_size);
        let resized = image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);

        let pad_x = (self.input_size - new_w) / 2;
        let pad_y = (self.input_size - new_h) / 2;
        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            let inside_x = x >= pad_x as usize && x < (pad_x + new_w) as usize;
            let inside_y = y >= pad_y as usize && y < (pad_y + new_h) as usize;
            let value = if inside_x && inside_y {
                resized.get_pixel(x as u32 - pad_x, y as u32 - pad_y)[c]
            } else {
                LETTERBOX_FILL
            };
            value as f32 / 255.0
        });

        Ok((
            input.into_tensor(),
            Placement {
                scale,
                pad_x: pad_x as f32,
                pad_y: pad_y as f32,
                src_width: src_w as f32,
                src_height: src_h as f32,
            },
        ))
    }
}

impl OutputDecoder {
    /// Accepts `[1, 4 + C, N]` or the transposed `[1, N, 4 + C]` layout.
    fn decode(&self, output: &Tensor, placement: Placement) -> Result<Vec<Observation>> {
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        let channels = 4 + self.labels.len();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(anyhow!("unexpected output shape {:?}", shape));
        }
        let channels_first = shape[1] == channels;
        if !channels_first && shape[2] != channels {
            return Err(anyhow!(
                "output shape {:?} does not match {} labels",
                shape,
                self.labels.len()
            ));
        }
        let anchors = if channels_first { shape[2] } else { shape[1] };
        let at = |channel: usize, anchor: usize| -> f32 {
            if channels_first {
                view[[0, channel, anchor]]
            } else {
                view[[0, anchor, channel]]
            }
        };

        let mut candidates = Vec::new();
        for anchor in 0..anchors {
            let mut scores: Vec<(usize, f32)> = (0..self.labels.len())
                .map(|class| (class, at(4 + class, anchor)))
                .filter(|(_, score)| score.is_finite())
                .collect();
            scores.sort_by(|a, b| b.1.total_cmp(&a.1));
            let Some(&(best_class, best_score)) = scores.first() else {
                continue;
            };
            if best_score < self.score_floor {
                continue;
            }

            let rect = placement.unletterbox(
                at(0, anchor),
                at(1, anchor),
                at(2, anchor),
                at(3, anchor),
            );
            let Some([x, y, w, h]) = rect else {
                continue;
            };

            candidates.push(Candidate {
                class: best_class,
                observation: Observation {
                    confidence: best_score.clamp(0.0, 1.0),
                    labels: scores
                        .iter()
                        .take(LABELS_PER_OBSERVATION)
                        .map(|&(class, score)| {
                            ClassLabel::new(self.labels[class].clone(), score.clamp(0.0, 1.0))
                        })
                        .collect(),
                    x,
                    y,
                    w,
                    h,
                },
            });
        }

        Ok(suppress_overlaps(candidates, self.iou_threshold))
    }
}

impl Placement {
    /// Map a center-format box in model-input pixels back to a normalized,
    /// bottom-left-origin box over the source frame.
    fn unletterbox(&self, cx: f32, cy: f32, w: f32, h: f32) -> Option<[f32; 4]> {
        let left = ((cx - w / 2.0 - self.pad_x) / self.scale).clamp(0.0, self.src_width);
        let top = ((cy - h / 2.0 - self.pad_y) / self.scale).clamp(0.0, self.src_height);
        let right = ((cx + w / 2.0 - self.pad_x) / self.scale).clamp(0.0, self.src_width);
        let bottom = ((cy + h / 2.0 - self.pad_y) / self.scale).clamp(0.0, self.src_height);
        if !(right > left && bottom > top) {
            return None;
        }

        let x = left / self.src_width;
        let width = (right - left) / self.src_width;
        let height = (bottom - top) / self.src_height;
        let y = (1.0 - bottom / self.src_height).max(0.0);
        Some([x, y, width.min(1.0 - x), height.min(1.0 - y)])
    }
}

struct Candidate {
    class: usize,
    observation: Observation,
}

/// Greedy per-class suppression, highest confidence first.
fn suppress_overlaps(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Observation> {
    candidates.sort_by(|a, b| b.observation.confidence.total_cmp(&a.observation.confidence));

    let mut suppressed = vec![false; candidates.len()];
    let mut kept = Vec::new();
    for i in 0..candidates.len() {
        if suppressed[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            if !suppressed[j]
                && candidates[i].class == candidates[j].class
                && iou(&candidates[i].observation, &candidates[j].observation) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
        kept.push(i);
    }

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    kept.into_iter()
        .filter_map(|i| slots[i].take())
        .map(|candidate| candidate.observation)
        .collect()
}

fn iou(a: &Observation, b: &Observation) -> f32 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.w).min(b.x + b.w);
    let y1 = (a.y + a.h).min(b.y + b.h);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.w * a.h + b.w * b.h - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

impl InferenceEngine for TractEngine {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, image: &ImageHandle, scale: ScaleMode) -> Result<Vec<Observation>> {
        if scale != ScaleMode::Fit {
            return Err(anyhow!("tract engine only supports fit scaling, got {:?}", scale));
        }
        let (input, placement) = self.build_input(image)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        self.decoder.decode(output, placement)
    }
}
