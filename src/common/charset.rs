use std::iter;

use encoding_rs::{SHIFT_JIS, UTF_8};
use serde::{Deserialize, Serialize};

// Charset
//------------------------------------------------------------------------------

/// Character set used to turn raw byte-mode payloads into text.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "ISO-8859-1")]
    Iso8859_1,
    #[serde(rename = "Shift_JIS")]
    ShiftJis,
}

// Tried after the preferred charset, in order. ISO-8859-1 accepts every byte
// sequence, so it must stay last.
const FALLBACK_ORDER: [Charset; 3] = [Charset::Utf8, Charset::ShiftJis, Charset::Iso8859_1];

impl Charset {
    /// None when the bytes are malformed for this charset.
    fn decode(self, bytes: &[u8]) -> Option<String> {
        let encoding = match self {
            Self::Utf8 => UTF_8,
            Self::ShiftJis => SHIFT_JIS,
            Self::Iso8859_1 => return Some(latin1(bytes)),
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
    }
}

// Every byte is its own code point, 0x80..0x9F included as C1 controls.
// encoding_rs follows WHATWG and would read those as windows-1252.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decodes payload bytes with the preferred charset, guessing another one when
/// the bytes are malformed for it.
pub fn decode_payload(bytes: &[u8], preferred: Charset) -> String {
    iter::once(preferred)
        .chain(FALLBACK_ORDER)
        .find_map(|cs| cs.decode(bytes))
        .unwrap_or_else(|| latin1(bytes))
}
