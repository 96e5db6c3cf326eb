//! Normalized and screen-space rectangles.
//!
//! Detector space: unit square, origin bottom-left, y grows upward.
//! Render space: pixels, origin top-left, y grows downward.

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Rectangle in detector-space convention. All components lie in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl NormalizedRect {
    /// Build a rect, rejecting non-finite or out-of-range components.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Result<Self, GeometryError> {
        Ok(Self {
            x: unit("x", x)?,
            y: unit("y", y)?,
            width: unit("width", width)?,
            height: unit("height", height)?,
        })
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Map into render space for a viewport, flipping the vertical axis.
    pub fn to_screen(&self, viewport: Viewport) -> ScreenRect {
        ScreenRect {
            left: self.x * viewport.width,
            top: (1.0 - self.y - self.height) * viewport.height,
            width: self.width * viewport.width,
            height: self.height * viewport.height,
        }
    }

    /// Serialize for the pipeline boundary as `{{x, y}, {w, h}}`.
    ///
    /// Components use shortest round-trip formatting, so `decode` recovers
    /// the exact same floats.
    pub fn encode(&self) -> String {
        format!(
            "{{{{{}, {}}}, {{{}, {}}}}}",
            self.x, self.y, self.width, self.height
        )
    }

    /// Parse the boundary encoding produced by [`NormalizedRect::encode`].
    ///
    /// Whitespace around tokens is ignored.
    pub fn decode(encoded: &str) -> Result<Self, GeometryError> {
        let malformed = || GeometryError::MalformedRect(encoded.to_string());

        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let inner = compact
            .strip_prefix("{{")
            .and_then(|s| s.strip_suffix("}}"))
            .ok_or_else(malformed)?;
        let (origin, size) = inner.split_once("},{").ok_or_else(malformed)?;

        let pair = |part: &str| -> Result<(f32, f32), GeometryError> {
            let (a, b) = part.split_once(',').ok_or_else(malformed)?;
            let a = a.parse::<f32>().map_err(|_| malformed())?;
            let b = b.parse::<f32>().map_err(|_| malformed())?;
            Ok((a, b))
        };
        let (x, y) = pair(origin)?;
        let (width, height) = pair(size)?;

        Self::new(x, y, width, height)
    }
}

fn unit(field: &'static str, value: f32) -> Result<f32, GeometryError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(GeometryError::OutOfRange { field, value })
    }
}

/// Size of the current render target in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in render-space pixels. Derived per paint, never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Shrink by `dx` on the left/right and `dy` on the top/bottom.
    pub fn inset(&self, dx: f32, dy: f32) -> Self {
        Self {
            left: self.left + dx,
            top: self.top + dy,
            width: (self.width - 2.0 * dx).max(0.0),
            height: (self.height - 2.0 * dy).max(0.0),
        }
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_quarter_box_maps_to_top_left_pixels() {
        let rect = NormalizedRect::new(0.25, 0.25, 0.5, 0.5).unwrap();
        let screen = rect.to_screen(Viewport::new(400.0, 200.0));
        assert_eq!(screen, ScreenRect::new(100.0, 50.0, 200.0, 100.0));
    }

    #[test]
    fn bottom_origin_box_lands_at_screen_bottom() {
        // Detector y = 0 is the bottom edge of the frame.
        let rect = NormalizedRect::new(0.0, 0.0, 0.5, 0.25).unwrap();
        let screen = rect.to_screen(Viewport::new(100.0, 100.0));
        assert_eq!(screen.top, 75.0);
        assert_eq!(screen.bottom(), 100.0);
        assert_eq!(screen.left, 0.0);
        assert_eq!(screen.width, 50.0);
    }

    #[test]
    fn top_edge_box_lands_at_screen_top() {
        let rect = NormalizedRect::new(0.5, 0.75, 0.5, 0.25).unwrap();
        let screen = rect.to_screen(Viewport::new(200.0, 400.0));
        assert_eq!(screen.top, 0.0);
        assert_eq!(screen.height, 100.0);
        assert_eq!(screen.left, 100.0);
        assert_eq!(screen.right(), 200.0);
    }

    #[test]
    fn full_frame_box_covers_viewport() {
        let rect = NormalizedRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let screen = rect.to_screen(Viewport::new(640.0, 480.0));
        assert_eq!(screen, ScreenRect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn rejects_out_of_range_components() {
        assert!(NormalizedRect::new(-0.1, 0.0, 0.5, 0.5).is_err());
        assert!(NormalizedRect::new(0.0, 1.5, 0.5, 0.5).is_err());
        assert!(NormalizedRect::new(0.0, 0.0, f32::NAN, 0.5).is_err());
        assert_eq!(
            NormalizedRect::new(0.0, 0.0, 0.5, f32::INFINITY),
            Err(GeometryError::OutOfRange {
                field: "height",
                value: f32::INFINITY
            })
        );
    }

    #[test]
    fn encoding_matches_host_rect_form() {
        let rect = NormalizedRect::new(0.25, 0.5, 0.125, 1.0).unwrap();
        assert_eq!(rect.encode(), "{{0.25, 0.5}, {0.125, 1}}");
    }

    #[test]
    fn canonical_strings_survive_decode_then_encode() {
        for s in [
            "{{0.1, 0.2}, {0.3, 0.4}}",
            "{{0, 0}, {1, 1}}",
            "{{0.33333334, 0.6666667}, {0.000001, 0.99999994}}",
            "{{0.5, 0.123456}, {0.7, 0.25}}",
        ] {
            let rect = NormalizedRect::decode(s).unwrap();
            assert_eq!(rect.encode(), s);
        }
    }

    #[test]
    fn each_component_decodes_independently() {
        let rect = NormalizedRect::decode("{{0.1, 0.2}, {0.3, 0.4}}").unwrap();
        assert_eq!(rect.x(), 0.1);
        assert_eq!(rect.y(), 0.2);
        assert_eq!(rect.width(), 0.3);
        assert_eq!(rect.height(), 0.4);
    }

    #[test]
    fn decode_tolerates_whitespace() {
        let rect = NormalizedRect::decode(" { {0.1,0.2} ,{ 0.3 , 0.4 } } ").unwrap();
        assert_eq!(rect.encode(), "{{0.1, 0.2}, {0.3, 0.4}}");
    }

    #[test]
    fn decode_rejects_malformed_input() {
        for s in [
            "",
            "{0.1, 0.2, 0.3, 0.4}",
            "{{0.1, 0.2}, {0.3}}",
            "{{0.1, 0.2}, {0.3, 0.4}",
            "{{a, 0.2}, {0.3, 0.4}}",
            "{{0.1, 0.2}, {0.3, 0.4, 0.5}}",
        ] {
            assert!(
                matches!(NormalizedRect::decode(s), Err(GeometryError::MalformedRect(_))),
                "expected malformed: {s:?}"
            );
        }
        assert!(matches!(
            NormalizedRect::decode("{{0.1, 0.2}, {1.3, 0.4}}"),
            Err(GeometryError::OutOfRange { field: "width", .. })
        ));
    }

    #[test]
    fn inset_shrinks_symmetrically() {
        let badge = ScreenRect::new(10.0, 20.0, 50.0, 24.0);
        assert_eq!(badge.inset(4.0, 2.0), ScreenRect::new(14.0, 22.0, 42.0, 20.0));
    }
}
