//! Windowed base64 for large payloads.
//!
//! Media payloads can run to hundreds of megabytes. Encoding happens in
//! windows that are a multiple of 3 bytes and decoding in windows that are
//! a multiple of 4 characters, so each window maps to a whole number of
//! base64 quanta and the concatenated output equals a one-shot encoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use safebox_common::{Error, Result};

/// Input window for encoding (48 KiB, a multiple of 3).
const ENCODE_WINDOW: usize = 3 * 16 * 1024;

/// Input window for decoding (64 KiB of text, a multiple of 4).
const DECODE_WINDOW: usize = 4 * 16 * 1024;

/// Encode bytes as standard padded base64.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for window in bytes.chunks(ENCODE_WINDOW) {
        STANDARD.encode_string(window, &mut out);
    }
    out
}

/// Decode standard padded base64.
///
/// # Errors
/// - `MalformedCiphertext` if the text is not valid base64
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let input = text.as_bytes();
    if input.len() % 4 != 0 {
        return Err(Error::MalformedCiphertext(format!(
            "base64 length {} is not a multiple of 4",
            input.len()
        )));
    }

    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    for window in input.chunks(DECODE_WINDOW) {
        STANDARD
            .decode_vec(window, &mut out)
            .map_err(|e| Error::MalformedCiphertext(format!("invalid base64: {}", e)))?;
    }
    Ok(out)
}
