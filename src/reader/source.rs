use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};
use tracing::debug;

use crate::common::error::{QRError, QRResult};

// ARGB buffer
//------------------------------------------------------------------------------

/// Host-addressable pixel buffer, one packed `0xAARRGGBB` value per pixel in
/// row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl ArgbBuffer {
    pub fn new(width: u32, height: u32, pixels: Vec<u32>) -> QRResult<Self> {
        if width == 0 || height == 0 {
            return Err(QRError::EmptyImage);
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(QRError::BufferSizeMismatch { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    pub fn from_rgba(img: &RgbaImage) -> QRResult<Self> {
        let (w, h) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
            })
            .collect();
        Self::new(w, h, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

// Pixel source
//------------------------------------------------------------------------------

/// Anything the static reader can pull pixels from.
///
/// Sources backed by device memory (GPU textures, hardware bitmaps) report
/// `is_host_addressable() == false`. Their pixels cannot be read in place and
/// must be copied into host memory with [`PixelSource::copy_to_host`] first.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);

    fn is_host_addressable(&self) -> bool {
        true
    }

    /// Reads pixels in place. Fails for sources living in device memory.
    fn read_argb(&self) -> QRResult<ArgbBuffer>;

    fn copy_to_host(&self) -> QRResult<ArgbBuffer> {
        self.read_argb()
    }
}

pub fn ensure_host_addressable<S: PixelSource + ?Sized>(src: &S) -> QRResult<()> {
    if src.is_host_addressable() {
        Ok(())
    } else {
        Err(QRError::NotHostAddressable)
    }
}

/// Brings any source into a host ARGB buffer, copying device-backed pixels
/// across first.
pub fn materialize<S: PixelSource + ?Sized>(src: &S) -> QRResult<ArgbBuffer> {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return Err(QRError::EmptyImage);
    }
    if !src.is_host_addressable() {
        debug!("Copying {w}x{h} device buffer to host memory");
        return src.copy_to_host();
    }
    src.read_argb()
}

impl PixelSource for ArgbBuffer {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read_argb(&self) -> QRResult<ArgbBuffer> {
        Ok(self.clone())
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn read_argb(&self) -> QRResult<ArgbBuffer> {
        ArgbBuffer::from_rgba(self)
    }
}

impl PixelSource for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn read_argb(&self) -> QRResult<ArgbBuffer> {
        let (w, h) = self.dimensions();
        let pixels = self
            .pixels()
            .map(|p| {
                let l = p.0[0] as u32;
                0xFF00_0000 | l << 16 | l << 8 | l
            })
            .collect();
        ArgbBuffer::new(w, h, pixels)
    }
}

impl PixelSource for DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        GenericImageView::dimensions(self)
    }

    fn read_argb(&self) -> QRResult<ArgbBuffer> {
        ArgbBuffer::from_rgba(&self.to_rgba8())
    }
}
