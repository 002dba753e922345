use thiserror::Error;

// Error
//------------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum QRError {
    // QR builder
    #[error("Empty data")]
    EmptyData,
    #[error("Data too long for any QR version")]
    DataTooLong,
    #[error("Invalid bitmap size {0}")]
    InvalidSize(u32),
    #[error("Quiet zone of {0} modules is too wide")]
    InvalidQuietZone(u32),

    // QR reader
    #[error("Unreadable image: {0}")]
    UnreadableImage(String),
    #[error("Pixel buffer is not host addressable")]
    NotHostAddressable,
    #[error("Pixel buffer size mismatch: expected {expected} pixels, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("Image has no pixels")]
    EmptyImage,
    #[error("Detector failure: {0}")]
    Detector(String),
}

/// Coarse classification surfaced to callers. Absence of a code is never an
/// error and has no kind.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorKind {
    Encoding,
    Decoding,
}

impl QRError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyData
            | Self::DataTooLong
            | Self::InvalidSize(_)
            | Self::InvalidQuietZone(_) => ErrorKind::Encoding,
            Self::UnreadableImage(_)
            | Self::NotHostAddressable
            | Self::BufferSizeMismatch { .. }
            | Self::EmptyImage
            | Self::Detector(_) => ErrorKind::Decoding,
        }
    }
}

impl From<image::ImageError> for QRError {
    fn from(e: image::ImageError) -> Self {
        Self::UnreadableImage(e.to_string())
    }
}

pub type QRResult<T> = Result<T, QRError>;
