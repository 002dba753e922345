//! # qrnova
//!
//! The engine of a QR scanning and generating utility: fixed-size QR bitmaps,
//! a static image reader with a binarizer fallback chain, a backpressured
//! live-frame scanner and a local scan history.
//!
//! ## Features
//!
//! - **QR Code Generation**: Text to a square two-tone bitmap, 512×512 by default
//! - **Static Image Reading**: Adaptive local thresholding, falling back to a global histogram threshold
//! - **Live Scanning**: One detection in flight, latest frame wins, pause after a hit
//! - **History**: Scanned and created codes in memory or a JSON file, PNGs for created codes
//!
//! ## Quick Start
//!
//! ### Generating a QR Code
//!
//! ```rust,no_run
//! use qrnova::QRBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new("https://example.com").build()?;
//! assert_eq!((qr.width(), qr.height()), (512, 512));
//!
//! qr.save_png("example.png")?;
//! println!("{}", qr.to_string_art());
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading a QR Code
//!
//! ```rust
//! use qrnova::{QRBuilder, QRReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let qr = QRBuilder::new("Hello, world!").build()?;
//!
//! // `None` means the image holds no readable code, errors are for bad input
//! let text = QRReader::new().read(qr.image())?;
//! assert_eq!(text.as_deref(), Some("Hello, world!"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Scanning Live Frames
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use qrnova::scanner::{Frame, LiveScanner, LumaDetector, LumaFrame, Rotation, ScanEvent};
//!
//! # async fn run(y_plane: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let (scanner, mut events) = LiveScanner::spawn_dedicated(Arc::new(LumaDetector::default()))?;
//!
//! let frame = LumaFrame::new(640, 480, 640, y_plane)?;
//! scanner.submit(Frame::new(frame, Rotation::Deg90).on_release(|| println!("frame released")));
//!
//! if let Some(ScanEvent::Found(text)) = events.recv().await {
//!     println!("Scanned: {text}");
//!     scanner.resume();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Decoding Strategies
//!
//! - **Hybrid**: 8×8 block local threshold, tolerates gradients and uneven lighting
//! - **Global histogram**: one threshold from the luminance histogram, for flat low contrast scans
//!
//! Strategies run in order until one yields a code. Any type implementing
//! [`reader::Binarizer`] can be pushed onto the chain.

#![allow(clippy::items_after_test_module)]

pub mod builder;
pub mod common;
pub mod history;
pub mod reader;
pub mod scanner;

pub use builder::{QRBuilder, QrBitmap};
pub use common::{
    Charset, Config, ConfigError, ECLevel, ErrorKind, QRError, QRResult, DEFAULT_CONFIG_PATH,
};
pub use history::{History, HistoryError, HistoryStore, ImageStore, JsonStore, MemoryStore};
pub use reader::{DecodeHints, QRReader};
pub use scanner::{LiveScanner, ScanEvent};
