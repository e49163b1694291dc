//! Authenticated encryption using AES-256-GCM with text framing.
//!
//! Ciphertext is carried as text: `base64(nonce) ":" base64(ciphertext || tag)`
//! with a 12-byte nonce drawn fresh for every call.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use crate::encoding;
use crate::keys::CipherKey;
use safebox_common::{Error, Result};

/// Nonce size for AES-256-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Separator between the nonce and ciphertext halves.
pub const SEPARATOR: char = ':';

/// Encrypt plaintext and return the framed ciphertext text.
///
/// # Postconditions
/// - Returns `base64(nonce):base64(ciphertext||tag)`
/// - The nonce is randomly generated for every call
///
/// # Errors
/// - Returns `Crypto` if the cipher rejects the input
pub fn seal(key: &CipherKey, plaintext: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("Invalid key length: {}", e)))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let nonce_text = encoding::encode(&nonce);
    let body_text = encoding::encode(&ciphertext);

    let mut framed = String::with_capacity(nonce_text.len() + 1 + body_text.len());
    framed.push_str(&nonce_text);
    framed.push(SEPARATOR);
    framed.push_str(&body_text);
    Ok(framed)
}

/// Split framed ciphertext into its decoded nonce and body.
///
/// # Errors
/// - `MalformedCiphertext` if the separator is absent, a half is empty,
///   base64 decoding fails, or the decoded sizes are impossible
pub fn parse_frame(framed: &str) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let (nonce_text, body_text) = framed
        .split_once(SEPARATOR)
        .ok_or_else(|| Error::MalformedCiphertext("missing ':' separator".to_string()))?;

    if nonce_text.is_empty() || body_text.is_empty() {
        return Err(Error::MalformedCiphertext(
            "empty nonce or ciphertext half".to_string(),
        ));
    }

    let nonce_bytes = encoding::decode(nonce_text)?;
    let nonce: [u8; NONCE_SIZE] = nonce_bytes.as_slice().try_into().map_err(|_| {
        Error::MalformedCiphertext(format!(
            "nonce must be {} bytes, got {}",
            NONCE_SIZE,
            nonce_bytes.len()
        ))
    })?;

    let body = encoding::decode(body_text)?;
    if body.len() < TAG_SIZE {
        return Err(Error::MalformedCiphertext(
            "ciphertext shorter than authentication tag".to_string(),
        ));
    }

    Ok((nonce, body))
}

/// Decrypt framed ciphertext text.
///
/// # Errors
/// - `MalformedCiphertext` for framing or encoding violations
/// - `AuthenticationFailure` if the tag does not verify; no plaintext is
///   ever returned in that case
pub fn open(key: &CipherKey, framed: &str) -> Result<Vec<u8>> {
    let (nonce, body) = parse_frame(framed)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Crypto(format!("Invalid key length: {}", e)))?;
    cipher
        .decrypt(Nonce::from_slice(&nonce), body.as_slice())
        .map_err(|_| Error::AuthenticationFailure)
}
