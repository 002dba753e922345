use async_trait::async_trait;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::frame::{LumaFrame, Rotation};
use crate::common::{
    charset::{decode_payload, Charset},
    error::{QRError, QRResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarcodeFormat {
    QrCode,
    DataMatrix,
    Aztec,
    Pdf417,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub format: BarcodeFormat,
    /// Decoded text, `None` when the symbol was located but not read
    pub raw_value: Option<String>,
    /// Corners in upright frame coordinates
    pub corners: Vec<(i32, i32)>,
}

// Detector
//------------------------------------------------------------------------------

/// Asynchronous barcode detector driven by the live scanner.
#[async_trait]
pub trait BarcodeDetector: Send + Sync {
    async fn process(&self, frame: &LumaFrame, rotation: Rotation) -> QRResult<Vec<DetectedCode>>;
}

/// Reads QR codes straight off the luminance plane on the blocking pool.
#[derive(Debug, Clone)]
pub struct LumaDetector {
    formats: Vec<BarcodeFormat>,
    charset: Charset,
}

impl Default for LumaDetector {
    fn default() -> Self {
        Self::new(vec![BarcodeFormat::QrCode])
    }
}

impl LumaDetector {
    pub fn new(formats: Vec<BarcodeFormat>) -> Self {
        Self { formats, charset: Charset::Utf8 }
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }
}

#[async_trait]
impl BarcodeDetector for LumaDetector {
    async fn process(&self, frame: &LumaFrame, rotation: Rotation) -> QRResult<Vec<DetectedCode>> {
        if !self.formats.contains(&BarcodeFormat::QrCode) {
            return Ok(Vec::new());
        }

        let img = frame.to_upright(rotation);
        let charset = self.charset;
        tokio::task::spawn_blocking(move || detect_qr(&img, charset))
            .await
            .map_err(|e| QRError::Detector(e.to_string()))
    }
}

fn detect_qr(img: &GrayImage, charset: Charset) -> Vec<DetectedCode> {
    let (w, h) = img.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
        img.get_pixel(x as u32, y as u32).0[0]
    });

    prepared
        .detect_grids()
        .iter()
        .map(|grid| {
            let corners = grid.bounds.iter().map(|p| (p.x, p.y)).collect();
            let mut payload = Vec::new();
            let raw_value = match grid.decode_to(&mut payload) {
                Ok(_) => Some(decode_payload(&payload, charset)),
                Err(e) => {
                    debug!("Located grid failed to decode: {e:?}");
                    None
                }
            };
            DetectedCode { format: BarcodeFormat::QrCode, raw_value, corners }
        })
        .collect()
}
