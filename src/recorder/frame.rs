//! Captured display frames and pixel layout conversion.

use serde::{Deserialize, Serialize};

use crate::{ClipsError, Result};

/// Channel order of a 32-bit captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Blue, green, red, alpha. What GDI hands back.
    Bgra,
    Rgba,
}

/// Resolution of the display being captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// One captured frame, 4 bytes per pixel, rows top-down with no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl RawFrame {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Wrap captured pixels. Fails when `data` does not cover the frame exactly.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(ClipsError::capture_failed(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, format, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Packed 24-bit BGR, the layout the encoder consumes.
    pub fn to_bgr24(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(bgr24_len(self.width, self.height));
        match self.format {
            PixelFormat::Bgra => {
                for px in self.data.chunks_exact(Self::BYTES_PER_PIXEL) {
                    out.extend_from_slice(&px[..3]);
                }
            }
            PixelFormat::Rgba => {
                for px in self.data.chunks_exact(Self::BYTES_PER_PIXEL) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
        }
        out
    }
}

/// Size in bytes of a packed BGR24 frame.
pub fn bgr24_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}
