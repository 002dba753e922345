use qrcodegen::QrCodeEcc;
use serde::{Deserialize, Serialize};

// Error correction level
//------------------------------------------------------------------------------

/// Minimum error correction level requested from the codec. The codec may boost
/// it when the payload still fits the chosen version.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum ECLevel {
    #[default]
    L = 0,
    M = 1,
    Q = 2,
    H = 3,
}

impl From<ECLevel> for QrCodeEcc {
    fn from(ecl: ECLevel) -> Self {
        match ecl {
            ECLevel::L => QrCodeEcc::Low,
            ECLevel::M => QrCodeEcc::Medium,
            ECLevel::Q => QrCodeEcc::Quartile,
            ECLevel::H => QrCodeEcc::High,
        }
    }
}

impl From<QrCodeEcc> for ECLevel {
    fn from(ecc: QrCodeEcc) -> Self {
        match ecc {
            QrCodeEcc::Low => ECLevel::L,
            QrCodeEcc::Medium => ECLevel::M,
            QrCodeEcc::Quartile => ECLevel::Q,
            QrCodeEcc::High => ECLevel::H,
        }
    }
}

impl std::fmt::Display for ECLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}
