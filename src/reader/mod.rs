pub mod binarize;
pub mod luminance;
pub mod source;

pub use binarize::{
    Binarizer, BinarizerKind, BinaryImage, GlobalHistogramBinarizer, HybridBinarizer,
};
pub use luminance::LuminanceSource;
pub use source::{ensure_host_addressable, materialize, ArgbBuffer, PixelSource};

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::common::{
    charset::{decode_payload, Charset},
    config::DecoderConfig,
    error::QRResult,
};

// Margin in pixels kept around the content when cropping a pure barcode
const PURE_BARCODE_MARGIN: u32 = 16;

// Decode hints
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeHints {
    /// Try every located grid and the inverted bitmap before giving up
    pub try_harder: bool,
    /// Image holds nothing but a single code on a plain background
    pub pure_barcode: bool,
    pub character_set: Charset,
}

impl Default for DecodeHints {
    fn default() -> Self {
        Self { try_harder: true, pure_barcode: false, character_set: Charset::Utf8 }
    }
}

// Reader
//------------------------------------------------------------------------------

/// Static image decoder. Binarization strategies are tried in order until one
/// produces a code.
pub struct QRReader {
    strategies: Vec<Box<dyn Binarizer + Send + Sync>>,
    hints: DecodeHints,
}

impl Default for QRReader {
    fn default() -> Self {
        Self::new()
    }
}

impl QRReader {
    /// Hybrid binarizer first, global histogram as fallback.
    pub fn new() -> Self {
        Self::with_config(&DecoderConfig::default())
    }

    pub fn with_config(config: &DecoderConfig) -> Self {
        let strategies = config
            .strategies
            .iter()
            .map(|&k| Box::new(k) as Box<dyn Binarizer + Send + Sync>)
            .collect();
        Self { strategies, hints: config.hints() }
    }

    pub fn hints(&mut self, hints: DecodeHints) -> &mut Self {
        self.hints = hints;
        self
    }

    pub fn clear_strategies(&mut self) -> &mut Self {
        self.strategies.clear();
        self
    }

    pub fn push_strategy<B: Binarizer + Send + Sync + 'static>(&mut self, b: B) -> &mut Self {
        self.strategies.push(Box::new(b));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Returns `Ok(None)` when no strategy finds a code. Errors are reserved
    /// for sources whose pixels cannot be read.
    pub fn read<S: PixelSource + ?Sized>(&self, src: &S) -> QRResult<Option<String>> {
        let argb = materialize(src)?;
        let luma = LuminanceSource::from_argb(&argb);
        Ok(self.read_luminance(&luma))
    }

    pub fn read_path<P: AsRef<Path>>(&self, path: P) -> QRResult<Option<String>> {
        let path = path.as_ref();
        debug!("Loading image {}", path.display());
        let img = image::open(path)?;
        self.read(&img)
    }

    pub fn read_luminance(&self, luma: &LuminanceSource) -> Option<String> {
        for strategy in self.strategies.iter() {
            debug!("Trying {} binarizer on {}x{}", strategy.name(), luma.width(), luma.height());
            let Some(bin) = strategy.binarize(luma) else {
                debug!("{} binarizer found no contrast", strategy.name());
                continue;
            };

            if let Some(text) = self.decode_binary(&bin) {
                info!("Decoded {} chars with {} binarizer", text.chars().count(), strategy.name());
                return Some(text);
            }
            warn!("{} binarizer failed to yield a code", strategy.name());
        }
        None
    }

    fn decode_binary(&self, bin: &BinaryImage) -> Option<String> {
        let cropped;
        let bin = if self.hints.pure_barcode {
            cropped = bin.crop_to_content(PURE_BARCODE_MARGIN)?;
            &cropped
        } else {
            bin
        };

        if let Some(text) = self.detect_and_decode(bin) {
            return Some(text);
        }
        if self.hints.try_harder {
            debug!("Retrying with inverted bitmap");
            return self.detect_and_decode(&bin.inverted());
        }
        None
    }

    fn detect_and_decode(&self, bin: &BinaryImage) -> Option<String> {
        let (w, h) = (bin.w as usize, bin.h as usize);
        let res = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut prepared = rqrr::PreparedImage::prepare_from_bitmap(w, h, |x, y| {
                bin.is_black(x as u32, y as u32)
            });
            let grids = prepared.detect_grids();
            debug!("Located {} grid(s)", grids.len());

            let limit = if self.hints.try_harder { grids.len() } else { 1 };
            for grid in grids.iter().take(limit) {
                let mut payload = Vec::new();
                match grid.decode_to(&mut payload) {
                    Ok(meta) => {
                        debug!("Grid decoded: {meta:?}");
                        return Some(decode_payload(&payload, self.hints.character_set));
                    }
                    Err(e) => debug!("Grid failed to decode: {e:?}"),
                }
            }
            None
        }));

        res.unwrap_or_else(|_| {
            warn!("QR codec panicked while decoding, treating as not found");
            None
        })
    }
}
