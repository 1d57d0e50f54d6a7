//! Frames produced by the simulator and their conversion for the encoder.
//!
//! - `Frame`: one rendered pixel buffer, owned for a single loop iteration.
//! - `PixelLayout`: channel order of the buffer as the renderer produced it.
//!
//! The encoder always receives packed BGR24. Conversion only reorders or drops
//! channels; there is no resampling.

use anyhow::{anyhow, Result};

/// Channel layout of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    Rgba8,
    Rgb8,
    Bgr8,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgba8 => 4,
            PixelLayout::Rgb8 | PixelLayout::Bgr8 => 3,
        }
    }
}

/// A single rendered frame.
///
/// Deliberately not `Clone`: a frame is fetched, converted and written, then
/// dropped before the next step.
#[derive(Debug)]
pub struct Frame {
    width: u32,
    height: u32,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer. The buffer length must match the geometry.
    pub fn new(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * layout.channels();
        if data.len() != expected {
            return Err(anyhow!(
                "{}x{} {:?} frame needs {} bytes, got {}",
                width,
                height,
                layout,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Convert into packed BGR24, consuming the frame.
    ///
    /// Already-BGR frames are returned without copying.
    pub fn into_bgr24(self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Bgr8 => self.data,
            PixelLayout::Rgb8 => {
                let mut out = self.data;
                for px in out.chunks_exact_mut(3) {
                    px.swap(0, 2);
                }
                out
            }
            PixelLayout::Rgba8 => {
                let mut out = Vec::with_capacity(self.data.len() / 4 * 3);
                for px in self.data.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
                out
            }
        }
    }
}
