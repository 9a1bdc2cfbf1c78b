//! Transport encoding for Negotiate tokens.
//!
//! Tokens travel in the `Authorization` / `WWW-Authenticate` headers as
//! standard base64 (`+/` alphabet, `=` padding). Decoding is permissive in the
//! same ways real clients are: embedded whitespace is ignored and a final block
//! may omit its padding.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use thiserror::Error;

/// Encoder: always pads.
const ENCODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_encode_padding(true),
);

/// Decoder: accepts padded and unpadded input, ignores stray low bits in the
/// final symbol.
const DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Errors produced while decoding a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The text is not valid standard base64.
    #[error("malformed token: {0}")]
    MalformedToken(String),
}

/// Encode raw token bytes for transport.
pub fn encode(bytes: &[u8]) -> String {
    ENCODER.encode(bytes)
}

/// Decode a transported token back into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, TokenError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    // A block can be short by at most two symbols.
    if compact.len() % 4 == 1 {
        return Err(TokenError::MalformedToken(format!(
            "length {} cannot be padded to a 4-symbol block",
            compact.len()
        )));
    }

    DECODER
        .decode(compact.as_bytes())
        .map_err(|e| TokenError::MalformedToken(e.to_string()))
}
