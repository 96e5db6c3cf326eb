//! Frame Overlay
//!
//! Overlays real-time object detections onto a live video surface.
//!
//! # Architecture
//!
//! ```text
//! raw frame ──► PixelBufferBuilder ──► ImageHandle ──► Detector ──► DetectionBatch
//!                                                                       │
//!                          (producer context)         OverlayHandle ◄───┘
//!                                                          │ mailbox
//!                          (render context)          OverlayRenderer ──► Canvas
//! ```
//!
//! The pipeline keeps three guarantees:
//!
//! 1. **Failures are contained**: a bad frame, a failed inference or a missing
//!    model yields an empty batch, never a panic across the pipeline boundary.
//! 2. **Batches are replaced, not edited**: the overlay holds exactly one
//!    frame's detections; newer updates always win.
//! 3. **Geometry is typed inside, serialized only at the edge**: the
//!    `{{x, y}, {w, h}}` rect string exists only in [`wire`].
//!
//! # Module Structure
//!
//! - `frame`: raw frame intake and engine-native pixel buffers
//! - `detect`: inference engine seam, detector filtering, model bundle
//! - `geometry`: normalized and screen-space rectangles
//! - `overlay`: renderer state, cross-context handoff, canvas
//! - `wire`: boundary records and the frame ingestion facade
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod overlay;
pub mod wire;

pub use config::OverlayConfig;
pub use detect::{
    ClassLabel, Detection, DetectionBatch, Detector, DetectorConfig, InferenceEngine,
    ModelBundle, Observation, ScaleMode, ScriptedEngine, StubEngine,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractEngine;
pub use error::{GeometryError, PipelineError};
pub use frame::{ImageHandle, PixelBufferBuilder, PixelFormat, RawFrame};
pub use geometry::{NormalizedRect, ScreenRect, Viewport};
pub use overlay::{Canvas, DrawList, DrawOp, OverlayHandle, OverlayRenderer, OverlayStyle};
pub use wire::{FramePipeline, WireDetection};
