use std::fmt::{Debug, Formatter};

use image::{imageops, GrayImage};

use crate::common::error::{QRError, QRResult};

// Rotation
//------------------------------------------------------------------------------

/// Clockwise rotation that brings a frame upright.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl TryFrom<u32> for Rotation {
    type Error = u32;

    fn try_from(degrees: u32) -> Result<Self, Self::Error> {
        match degrees % 360 {
            0 => Ok(Self::Deg0),
            90 => Ok(Self::Deg90),
            180 => Ok(Self::Deg180),
            270 => Ok(Self::Deg270),
            _ => Err(degrees),
        }
    }
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }
}

// Luma frame
//------------------------------------------------------------------------------

/// Y plane of a camera frame. Rows may be padded past `width`.
#[derive(Clone, PartialEq, Eq)]
pub struct LumaFrame {
    width: u32,
    height: u32,
    row_stride: usize,
    data: Vec<u8>,
}

impl Debug for LumaFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LumaFrame {{ {}x{}, stride: {} }}", self.width, self.height, self.row_stride)
    }
}

impl LumaFrame {
    pub fn new(width: u32, height: u32, row_stride: usize, data: Vec<u8>) -> QRResult<Self> {
        if width == 0 || height == 0 {
            return Err(QRError::EmptyImage);
        }
        if row_stride < width as usize {
            return Err(QRError::BufferSizeMismatch { expected: width as usize, actual: row_stride });
        }
        // Last row needs only `width` bytes
        let expected = row_stride * (height as usize - 1) + width as usize;
        if data.len() < expected {
            return Err(QRError::BufferSizeMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, row_stride, data })
    }

    pub fn from_gray(img: &GrayImage) -> QRResult<Self> {
        let (w, h) = img.dimensions();
        Self::new(w, h, w as usize, img.as_raw().clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_stride;
        &self.data[start..start + self.width as usize]
    }

    /// Packs the rows tightly and applies the rotation hint.
    pub fn to_upright(&self, rotation: Rotation) -> GrayImage {
        let img = GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.row(y)[x as usize]])
        });
        match rotation {
            Rotation::Deg0 => img,
            Rotation::Deg90 => imageops::rotate90(&img),
            Rotation::Deg180 => imageops::rotate180(&img),
            Rotation::Deg270 => imageops::rotate270(&img),
        }
    }
}

// Frame
//------------------------------------------------------------------------------

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Camera frame on loan from the capture pipeline.
///
/// The release hook hands the underlying buffer back to the camera. It runs
/// exactly once, when the frame is dropped, whatever path the frame took
/// through the scanner.
pub struct Frame {
    image: Option<LumaFrame>,
    rotation: Rotation,
    release: Option<ReleaseHook>,
}

impl Debug for Frame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("image", &self.image)
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}

impl Frame {
    pub fn new(image: LumaFrame, rotation: Rotation) -> Self {
        Self { image: Some(image), rotation, release: None }
    }

    /// Frame whose image buffer could not be acquired. It is still released.
    pub fn empty(rotation: Rotation) -> Self {
        Self { image: None, rotation, release: None }
    }

    pub fn on_release<F: FnOnce() + Send + 'static>(mut self, f: F) -> Self {
        self.release = Some(Box::new(f));
        self
    }

    pub fn image(&self) -> Option<&LumaFrame> {
        self.image.as_ref()
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Moves the image out. The frame keeps its release hook.
    pub fn take_image(&mut self) -> Option<LumaFrame> {
        self.image.take()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
