//! Overlay rendering: holds the latest detection batch and paints it onto a
//! render surface on the render context's own schedule.
//!
//! Producers talk to the overlay through an [`OverlayHandle`]; the render
//! context owns the [`OverlayRenderer`] and polls it once per redraw tick.

mod canvas;
mod renderer;

pub use canvas::{Canvas, Color, DrawList, DrawOp, MonospaceMetrics, TextExtent, TextStyle};
pub use renderer::{channel, OverlayHandle, OverlayRenderer, OverlayStyle};
