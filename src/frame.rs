//! Raw frame intake and engine-native pixel buffers.
//!
//! - `RawFrame`: borrowed view over a packed pixel buffer handed over by the
//!   streaming collaborator. Not retained across calls.
//! - `ImageHandle`: owned, engine-native BGRA buffer. Exclusively owned by the
//!   detection call it was built for; pixel memory is zeroized on drop.
//! - `PixelBufferBuilder`: validates a raw frame and copies it row by row,
//!   honoring the source stride.

use zeroize::Zeroize;

use crate::error::PipelineError;

/// Source pixel layouts accepted from the streaming collaborator.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8 bits per channel, R G B A byte order.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// Bytes per pixel of the engine-native layout (32-bit packed BGRA).
pub const ENGINE_BYTES_PER_PIXEL: usize = 4;

// ----------------------------------------------------------------------------
// RawFrame
// ----------------------------------------------------------------------------

/// A packed frame as delivered by the video pipeline.
///
/// The row stride may exceed `width * bytes_per_pixel` when rows are padded.
#[derive(Clone, Copy, Debug)]
pub struct RawFrame<'a> {
    bytes: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: usize,
    pub pixel_format: PixelFormat,
}

impl<'a> RawFrame<'a> {
    /// Wrap an RGBA8 buffer. Preconditions are checked when the frame is built.
    pub fn rgba(bytes: &'a [u8], width: u32, height: u32, row_stride: usize) -> Self {
        Self {
            bytes,
            width,
            height,
            row_stride,
            pixel_format: PixelFormat::Rgba8,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Check the frame preconditions and return `(row_bytes, required_len)`.
    fn validate(&self) -> Result<(usize, usize), PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::malformed(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        let row_bytes = (self.width as usize)
            .checked_mul(self.pixel_format.bytes_per_pixel())
            .ok_or_else(|| PipelineError::malformed("frame width overflows row size"))?;
        if self.row_stride < row_bytes {
            return Err(PipelineError::malformed(format!(
                "row stride {} is smaller than {} bytes of pixels per row",
                self.row_stride, row_bytes
            )));
        }

        let required = self
            .row_stride
            .checked_mul(self.height as usize)
            .ok_or_else(|| PipelineError::malformed("frame stride x height overflows"))?;
        if self.bytes.len() < required {
            return Err(PipelineError::malformed(format!(
                "expected at least {} bytes for {} rows of stride {}, received {}",
                required,
                self.height,
                self.row_stride,
                self.bytes.len()
            )));
        }

        Ok((row_bytes, required))
    }
}

// ----------------------------------------------------------------------------
// ImageHandle
// ----------------------------------------------------------------------------

/// Engine-native image: tightly packed 32-bit BGRA, `width * 4` bytes per row.
///
/// There is no `Clone`; a handle belongs to exactly one detection call and is
/// released when that call returns, on every path.
pub struct ImageHandle {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl ImageHandle {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_row(&self) -> usize {
        self.width as usize * ENGINE_BYTES_PER_PIXEL
    }

    /// Read-only BGRA pixel memory for inference engines.
    ///
    /// Engines must not retain the slice beyond their `infer` call.
    pub fn bgra_pixels(&self) -> &[u8] {
        &self.data
    }

    /// BGRA value at `(x, y)`, top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.bytes_per_row() + x as usize * ENGINE_BYTES_PER_PIXEL;
        let px = self.data.get(offset..offset + ENGINE_BYTES_PER_PIXEL)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// ----------------------------------------------------------------------------
// PixelBufferBuilder
// ----------------------------------------------------------------------------

/// Converts raw frames into engine-native image handles. Stateless.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelBufferBuilder;

impl PixelBufferBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build from loose RGBA8 parts.
    pub fn build(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        row_stride: usize,
    ) -> Result<ImageHandle, PipelineError> {
        self.build_frame(&RawFrame::rgba(bytes, width, height, row_stride))
    }

    /// Build an engine-native handle, copying each source row at its stride.
    ///
    /// Padding bytes at the end of source rows are never copied.
    pub fn build_frame(&self, frame: &RawFrame<'_>) -> Result<ImageHandle, PipelineError> {
        let (src_row_bytes, _) = frame.validate()?;

        let width = frame.width as usize;
        let height = frame.height as usize;
        let dst_row_bytes = width
            .checked_mul(ENGINE_BYTES_PER_PIXEL)
            .ok_or_else(|| PipelineError::malformed("destination row size overflows"))?;
        let dst_len = dst_row_bytes
            .checked_mul(height)
            .ok_or_else(|| PipelineError::malformed("destination buffer size overflows"))?;

        let mut data = Vec::new();
        data.try_reserve_exact(dst_len).map_err(|e| {
            PipelineError::BufferConstruction(format!(
                "could not allocate {} bytes for {}x{} BGRA buffer: {}",
                dst_len, frame.width, frame.height, e
            ))
        })?;

        match frame.pixel_format {
            PixelFormat::Rgba8 => {
                for row in frame.bytes.chunks(frame.row_stride).take(height) {
                    for px in row[..src_row_bytes].chunks_exact(4) {
                        data.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                    }
                }
            }
        }

        Ok(ImageHandle {
            data,
            width: frame.width,
            height: frame.height,
        })
    }
}
