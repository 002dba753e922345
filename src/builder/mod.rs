mod render;

pub use render::{ModuleGrid, DARK, LIGHT};

use std::io::Cursor;
use std::path::Path;

use image::{GrayImage, ImageFormat};
use qrcodegen::QrCode;
use tracing::{debug, warn};

use crate::common::{
    config::EncoderConfig,
    error::{QRError, QRResult},
    metadata::ECLevel,
};

pub const DEFAULT_SIZE: u32 = 512;
pub const DEFAULT_QUIET_ZONE: u32 = 4;
/// Widest accepted quiet zone, in modules
pub const MAX_QUIET_ZONE: u32 = 64;

pub struct QRBuilder<'a> {
    data: &'a str,
    size: u32,
    quiet_zone: u32,
    ec_level: ECLevel,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a str) -> Self {
        Self { data, size: DEFAULT_SIZE, quiet_zone: DEFAULT_QUIET_ZONE, ec_level: ECLevel::L }
    }

    pub fn with_config(data: &'a str, config: &EncoderConfig) -> Self {
        Self { data, size: config.size, quiet_zone: config.quiet_zone, ec_level: config.ec_level }
    }

    pub fn data(&mut self, data: &'a str) -> &mut Self {
        self.data = data;
        self
    }

    pub fn size(&mut self, size: u32) -> &mut Self {
        self.size = size;
        self
    }

    pub fn quiet_zone(&mut self, quiet_zone: u32) -> &mut Self {
        self.quiet_zone = quiet_zone;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn metadata(&self) -> String {
        format!(
            "{{ Size: {}, Quiet zone: {}, Ec level: {} }}",
            self.size, self.quiet_zone, self.ec_level
        )
    }

    /// Encodes the text and rasterizes it. Blank text is rejected before the
    /// codec is involved.
    pub fn build(&self) -> QRResult<QrBitmap> {
        if self.data.trim().is_empty() {
            return Err(QRError::EmptyData);
        }
        if self.size == 0 {
            return Err(QRError::InvalidSize(self.size));
        }
        if self.quiet_zone > MAX_QUIET_ZONE {
            return Err(QRError::InvalidQuietZone(self.quiet_zone));
        }

        debug!("Generating QR {}", self.metadata());
        let code = QrCode::encode_text(self.data, self.ec_level.into()).map_err(|e| {
            warn!("Cannot encode {} bytes: {e}", self.data.len());
            QRError::DataTooLong
        })?;

        let grid = ModuleGrid::from_code(&code);
        let image = render::render(&grid, self.size, self.quiet_zone);
        debug!(
            "Encoded version {} at ec level {} into {}px",
            code.version().value(),
            ECLevel::from(code.error_correction_level()),
            image.width()
        );

        Ok(QrBitmap {
            text: self.data.to_string(),
            version: code.version().value(),
            ec_level: code.error_correction_level().into(),
            quiet_zone: self.quiet_zone as usize,
            grid,
            image,
        })
    }
}

// QR bitmap
//------------------------------------------------------------------------------

/// Two-tone raster of an encoded symbol. Immutable once built.
#[derive(Debug, Clone)]
pub struct QrBitmap {
    text: String,
    version: u8,
    ec_level: ECLevel,
    quiet_zone: usize,
    grid: ModuleGrid,
    image: GrayImage,
}

impl QrBitmap {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn ec_level(&self) -> ECLevel {
        self.ec_level
    }

    pub fn modules(&self) -> &ModuleGrid {
        &self.grid
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }

    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        *self.image.get_pixel(x, y) == DARK
    }

    pub fn to_png_bytes(&self) -> QRResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.image.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> QRResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    pub fn to_string_art(&self) -> String {
        render::to_str(&self.grid, self.quiet_zone)
    }
}
