use image::{GrayImage, Luma};

use super::source::ArgbBuffer;
use crate::common::error::{QRError, QRResult};

// Luminance source
//------------------------------------------------------------------------------

/// Brightness-only view of an image, 0 is black and 255 is white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceSource {
    w: u32,
    h: u32,
    luma: Vec<u8>,
}

impl LuminanceSource {
    pub fn new(w: u32, h: u32, luma: Vec<u8>) -> QRResult<Self> {
        if w == 0 || h == 0 {
            return Err(QRError::EmptyImage);
        }
        let expected = w as usize * h as usize;
        if luma.len() != expected {
            return Err(QRError::BufferSizeMismatch { expected, actual: luma.len() });
        }
        Ok(Self { w, h, luma })
    }

    /// Converts ARGB pixels with `(r + 2g + b) / 4`, after compositing each
    /// pixel over a white background so transparent areas read as light.
    pub fn from_argb(buf: &ArgbBuffer) -> Self {
        let luma = buf.pixels().iter().map(|&p| argb_to_luma(p)).collect();
        Self { w: buf.width(), h: buf.height(), luma }
    }

    pub fn from_gray(img: &GrayImage) -> QRResult<Self> {
        let (w, h) = img.dimensions();
        Self::new(w, h, img.as_raw().clone())
    }

    pub fn width(&self) -> u32 {
        self.w
    }

    pub fn height(&self) -> u32 {
        self.h
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.luma[(y * self.w + x) as usize]
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.w) as usize;
        &self.luma[start..start + self.w as usize]
    }

    pub fn crop(&self, left: u32, top: u32, w: u32, h: u32) -> QRResult<Self> {
        if w == 0 || h == 0 || left + w > self.w || top + h > self.h {
            return Err(QRError::EmptyImage);
        }
        let mut luma = Vec::with_capacity((w * h) as usize);
        for y in top..top + h {
            luma.extend_from_slice(&self.row(y)[left as usize..(left + w) as usize]);
        }
        Ok(Self { w, h, luma })
    }

    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.w, self.h, |x, y| Luma([self.get(x, y)]))
    }
}

fn argb_to_luma(p: u32) -> u8 {
    let a = p >> 24;
    let over_white = |c: u32| (c * a + 255 * (255 - a)) / 255;
    let r = over_white((p >> 16) & 0xFF);
    let g = over_white((p >> 8) & 0xFF);
    let b = over_white(p & 0xFF);
    ((r + 2 * g + b) / 4) as u8
}
