use anyhow::Result;

use crate::detect::engine::{ClassLabel, InferenceEngine, Observation, ScaleMode};
use crate::frame::ImageHandle;

const DEFAULT_LUMA_THRESHOLD: u8 = 200;

/// Stub engine for demos and tests.
///
/// Reports the bounding box of bright pixels as a single `person`
/// observation. Confidence is the fraction of that box covered by bright
/// pixels. The whole frame is always considered, so every scale mode
/// behaves like `Fit`.
pub struct StubEngine {
    label: String,
    luma_threshold: u8,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            label: "person".to_string(),
            luma_threshold: DEFAULT_LUMA_THRESHOLD,
        }
    }

    /// Label reported for the bright region.
    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_luma_threshold(mut self, threshold: u8) -> Self {
        self.luma_threshold = threshold;
        self
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, image: &ImageHandle, _scale: ScaleMode) -> Result<Vec<Observation>> {
        let width = image.width() as usize;
        let height = image.height() as usize;

        let mut bright = 0usize;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        for (row_idx, row) in image
            .bgra_pixels()
            .chunks_exact(image.bytes_per_row())
            .enumerate()
        {
            for (col_idx, px) in row.chunks_exact(4).enumerate() {
                if luma(px[2], px[1], px[0]) < self.luma_threshold {
                    continue;
                }
                bright += 1;
                min_x = min_x.min(col_idx);
                min_y = min_y.min(row_idx);
                max_x = max_x.max(col_idx);
                max_y = max_y.max(row_idx);
            }
        }

        if bright == 0 {
            return Ok(Vec::new());
        }

        let box_w = max_x - min_x + 1;
        let box_h = max_y - min_y + 1;
        let confidence = bright as f32 / (box_w * box_h) as f32;

        // Pixel rows grow downward; detector space grows upward from the bottom.
        let x = min_x as f32 / width as f32;
        let w = box_w as f32 / width as f32;
        let h = box_h as f32 / height as f32;
        let y = (height - 1 - max_y) as f32 / height as f32;

        Ok(vec![Observation {
            confidence,
            labels: vec![ClassLabel::new(self.label.clone(), confidence)],
            x,
            y,
            w,
            h,
        }])
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelBufferBuilder;

    fn frame_with_block(
        width: u32,
        height: u32,
        block: (u32, u32, u32, u32),
    ) -> ImageHandle {
        let (bx, by, bw, bh) = block;
        let mut bytes = vec![0u8; (width * height * 4) as usize];
        for y in by..by + bh {
            for x in bx..bx + bw {
                let o = ((y * width + x) * 4) as usize;
                bytes[o..o + 4].copy_from_slice(&[255, 255, 255, 255]);
            }
        }
        PixelBufferBuilder::new()
            .build(&bytes, width, height, width as usize * 4)
            .unwrap()
    }

    #[test]
    fn dark_frame_has_no_observations() {
        let image = frame_with_block(8, 8, (0, 0, 0, 0));
        let obs = StubEngine::new().infer(&image, ScaleMode::Fit).unwrap();
        assert!(obs.is_empty());
    }

    #[test]
    fn bright_block_reports_bottom_left_box() {
        // Block in the top-left quadrant of a 10x10 frame.
        let image = frame_with_block(10, 10, (0, 0, 5, 5));
        let obs = StubEngine::new().infer(&image, ScaleMode::Fit).unwrap();

        assert_eq!(obs.len(), 1);
        let o = &obs[0];
        assert_eq!(o.confidence, 1.0);
        assert_eq!(o.best_label().map(|l| l.identifier.as_str()), Some("person"));
        assert_eq!((o.x, o.w, o.h), (0.0, 0.5, 0.5));
        // Top half of the frame starts halfway up in detector space.
        assert_eq!(o.y, 0.5);
    }

    #[test]
    fn every_scale_mode_sees_the_whole_frame() {
        let image = frame_with_block(10, 6, (2, 1, 3, 2));
        let mut engine = StubEngine::new();
        let fit = engine.infer(&image, ScaleMode::Fit).unwrap();
        for mode in [ScaleMode::Fill, ScaleMode::CenterCrop] {
            assert_eq!(engine.infer(&image, mode).unwrap(), fit);
        }
    }
}
