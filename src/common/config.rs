//! # Configuration
//!
//! Runtime settings for the encoder, the static image reader, the live scanner
//! and the history store, loaded from `qrnova.toml`. Every section and field is
//! optional; anything missing takes its default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::charset::Charset;
use super::metadata::ECLevel;
use crate::builder::MAX_QUIET_ZONE;
use crate::reader::{BinarizerKind, DecodeHints};
use crate::scanner::BarcodeFormat;

pub const DEFAULT_CONFIG_PATH: &str = "qrnova.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file format: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Application configuration loaded from qrnova.toml
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub encoder: EncoderConfig,
    pub decoder: DecoderConfig,
    pub live: LiveConfig,
    pub history: HistoryConfig,
}

/// QR bitmap generation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Side length of the generated bitmap in pixels
    pub size: u32,
    /// Blank margin around the symbol, in modules
    pub quiet_zone: u32,
    /// Minimum error correction level
    pub ec_level: ECLevel,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { size: 512, quiet_zone: 4, ec_level: ECLevel::L }
    }
}

/// Static image decoding
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Binarizers tried in order until one yields a code
    pub strategies: Vec<BinarizerKind>,
    pub try_harder: bool,
    pub pure_barcode: bool,
    pub character_set: Charset,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            strategies: vec![BinarizerKind::Hybrid, BinarizerKind::GlobalHistogram],
            try_harder: true,
            pure_barcode: false,
            character_set: Charset::Utf8,
        }
    }
}

impl DecoderConfig {
    pub fn hints(&self) -> DecodeHints {
        DecodeHints {
            try_harder: self.try_harder,
            pure_barcode: self.pure_barcode,
            character_set: self.character_set,
        }
    }
}

/// Live camera scanning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Symbologies the frame detector reports
    pub formats: Vec<BarcodeFormat>,
    pub initial_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom added after every hit while below `auto_zoom_limit`
    pub auto_zoom_step: f32,
    pub auto_zoom_limit: f32,
}

impl LiveConfig {
    /// Zoom bounds must be finite, positive and ordered. The other zoom values
    /// must be finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_zoom, self.max_zoom);
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::Invalid(format!("zoom bounds {min}..{max}")));
        }
        for (name, value) in [
            ("initial_zoom", self.initial_zoom),
            ("auto_zoom_step", self.auto_zoom_step),
            ("auto_zoom_limit", self.auto_zoom_limit),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} = {value}")));
            }
        }
        Ok(())
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            formats: vec![BarcodeFormat::QrCode],
            initial_zoom: 1.2,
            min_zoom: 0.5,
            max_zoom: 9.0,
            auto_zoom_step: 0.1,
            auto_zoom_limit: 2.0,
        }
    }
}

/// Scan history persistence
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    /// Directory holding PNGs of created codes
    pub image_dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("qr_history.json"), image_dir: PathBuf::from("QRNova") }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::Invalid("size = 0".into()));
        }
        if self.quiet_zone > MAX_QUIET_ZONE {
            return Err(ConfigError::Invalid(format!(
                "quiet_zone = {}, at most {MAX_QUIET_ZONE}",
                self.quiet_zone
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from qrnova.toml, falling back to defaults
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from the given path.
    /// Falls back to the default configuration if the file doesn't exist or is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::try_load_from_path(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(ConfigError::Io(_)) => {
                info!("No config file at {}, using default configuration", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}, using default configuration");
                Self::default()
            }
        }
    }

    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.encoder.validate()?;
        self.live.validate()
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
