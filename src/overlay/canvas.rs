use serde::Serialize;

use crate::geometry::{ScreenRect, Viewport};

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with alpha scaled to `alpha` in `[0, 1]`.
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Color,
}

/// Measured size of a run of text.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Drawing surface owned by the render context.
pub trait Canvas {
    /// Reset the whole surface to transparent.
    fn clear(&mut self, viewport: Viewport);

    fn stroke_rect(&mut self, rect: ScreenRect, color: Color, line_width: f32);

    fn fill_rect(&mut self, rect: ScreenRect, color: Color);

    fn measure_text(&self, text: &str, style: &TextStyle) -> TextExtent;

    fn draw_text(&mut self, text: &str, rect: ScreenRect, style: &TextStyle);
}

/// Fixed-advance text metrics, proportional to font size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonospaceMetrics {
    pub advance_ratio: f32,
    pub line_height_ratio: f32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            advance_ratio: 0.6,
            line_height_ratio: 1.2,
        }
    }
}

impl MonospaceMetrics {
    pub fn measure(&self, text: &str, font_size: f32) -> TextExtent {
        TextExtent {
            width: text.chars().count() as f32 * font_size * self.advance_ratio,
            height: font_size * self.line_height_ratio,
        }
    }
}

/// One recorded drawing command.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Clear {
        viewport: Viewport,
    },
    StrokeRect {
        rect: ScreenRect,
        color: Color,
        line_width: f32,
    },
    FillRect {
        rect: ScreenRect,
        color: Color,
    },
    Text {
        text: String,
        rect: ScreenRect,
        style: TextStyle,
    },
}

/// Canvas that records drawing commands instead of rasterizing them.
///
/// Hosts replay the list onto their native surface; tests inspect it.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    ops: Vec<DrawOp>,
    metrics: MonospaceMetrics,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: MonospaceMetrics) -> Self {
        Self {
            ops: Vec::new(),
            metrics,
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<DrawOp> {
        self.ops
    }

    /// Box outlines drawn since the last clear.
    pub fn stroked_rects(&self) -> Vec<ScreenRect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn filled_rects(&self) -> Vec<ScreenRect> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::FillRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for DrawList {
    fn clear(&mut self, viewport: Viewport) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear { viewport });
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Color, line_width: f32) {
        self.ops.push(DrawOp::StrokeRect {
            rect,
            color,
            line_width,
        });
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Color) {
        self.ops.push(DrawOp::FillRect { rect, color });
    }

    fn measure_text(&self, text: &str, style: &TextStyle) -> TextExtent {
        self.metrics.measure(text, style.font_size)
    }

    fn draw_text(&mut self, text: &str, rect: ScreenRect, style: &TextStyle) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            rect,
            style: *style,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_measure_scales_with_font() {
        let m = MonospaceMetrics::default();
        let extent = m.measure("person 90%", 10.0);
        assert!((extent.width - 60.0).abs() < 1e-3);
        assert!((extent.height - 12.0).abs() < 1e-3);
    }

    #[test]
    fn clear_discards_previous_ops() {
        let mut list = DrawList::new();
        list.fill_rect(ScreenRect::default(), Color::BLACK);
        list.clear(Viewport::new(10.0, 10.0));
        assert_eq!(
            list.ops(),
            &[DrawOp::Clear {
                viewport: Viewport::new(10.0, 10.0)
            }]
        );
    }

    #[test]
    fn ops_serialize_with_tag() {
        let op = DrawOp::FillRect {
            rect: ScreenRect::new(1.0, 2.0, 3.0, 4.0),
            color: Color::BLACK.with_alpha(0.5),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "fill_rect");
        assert_eq!(json["color"]["a"], 128);
        assert_eq!(json["rect"]["left"], 1.0);
    }
}
