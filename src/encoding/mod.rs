//! Binary-to-text transfer encodings.
//!
//! Applied to the final framed bytes when an envelope travels over a
//! text-only channel.

mod base62;

use std::fmt;
use std::str::FromStr;

use base64::{
    alphabet,
    engine::{
        general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE_NO_PAD},
        DecodePaddingMode,
    },
    Engine as _,
};

use crate::core::EncodingError;

pub use base62::{decode as base62_decode, encode as base62_encode};

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Text encoding selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// Standard alphabet, padded.
    Base64,
    /// URL-safe alphabet, unpadded.
    Base64Url,
    /// Lowercase hexadecimal.
    Hex,
    /// `0-9A-Za-z`, leading zero bytes preserved.
    Base62,
}

impl TextEncoding {
    /// Every supported encoding.
    pub const ALL: [TextEncoding; 4] = [
        TextEncoding::Base64,
        TextEncoding::Base64Url,
        TextEncoding::Hex,
        TextEncoding::Base62,
    ];

    /// Wire name, as used in the transfer-encoding header.
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Base64 => "base64",
            TextEncoding::Base64Url => "base64url",
            TextEncoding::Hex => "hex",
            TextEncoding::Base62 => "base62",
        }
    }

    /// Encode bytes to text.
    pub fn encode(self, data: &[u8]) -> String {
        match self {
            TextEncoding::Base64 => STANDARD.encode(data),
            TextEncoding::Base64Url => URL_SAFE_NO_PAD.encode(data),
            TextEncoding::Hex => hex::encode(data),
            TextEncoding::Base62 => base62::encode(data),
        }
    }

    /// Decode text to bytes.
    ///
    /// Base64 variants accept input with or without padding. Hex is
    /// case-insensitive.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let malformed = |reason: String| EncodingError::Malformed {
            encoding: self.name(),
            reason,
        };
        match self {
            TextEncoding::Base64 => STANDARD_LENIENT
                .decode(text)
                .map_err(|e| malformed(e.to_string())),
            TextEncoding::Base64Url => URL_SAFE_LENIENT
                .decode(text)
                .map_err(|e| malformed(e.to_string())),
            TextEncoding::Hex => hex::decode(text).map_err(|e| malformed(e.to_string())),
            TextEncoding::Base62 => base62::decode(text),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TextEncoding::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EncodingError::Unsupported(wanted.to_string()))
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
