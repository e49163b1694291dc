//! Key derivation using PBKDF2-HMAC-SHA256.
//!
//! Passphrases are stretched into 256-bit AES keys with 100,000 rounds of
//! PBKDF2 over SHA-256. The salt is either the fixed legacy constant, which
//! keeps ciphertext produced by older installations readable, or a random
//! per-vault value persisted next to the data it protects.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

use crate::encoding;
use crate::keys::{CipherKey, KEY_LENGTH};
use safebox_common::{Error, Result};

/// Number of PBKDF2 rounds used for every vault key.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt shared by every installation of the original vault format.
///
/// Keys derived with it are open to cross-installation precomputation;
/// new vault material uses [`Salt::generate`].
pub const LEGACY_SALT: &[u8] = b"filevault-static-salt";

/// Length of generated salts in bytes.
pub const SALT_LENGTH: usize = 16;

/// Parameters for PBKDF2 key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Number of HMAC-SHA256 rounds.
    pub iterations: u32,
}

impl KdfParams {
    /// Parameters used for all stored vault data.
    pub fn standard() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// Create parameters with a custom round count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Salt for key derivation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// The fixed legacy salt.
    pub fn legacy() -> Self {
        Self(LEGACY_SALT.to_vec())
    }

    /// Generate a random salt.
    pub fn generate() -> Self {
        let mut salt = vec![0u8; SALT_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    ///
    /// # Errors
    /// - Returns error if `bytes` is empty
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("Salt cannot be empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Parse a base64-encoded salt.
    pub fn from_base64(text: &str) -> Result<Self> {
        let bytes = encoding::decode(text.trim())
            .map_err(|_| Error::InvalidInput("Salt is not valid base64".to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Encode the salt as base64.
    pub fn to_base64(&self) -> String {
        encoding::encode(&self.0)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check whether this is the fixed legacy salt.
    pub fn is_legacy(&self) -> bool {
        self.0 == LEGACY_SALT
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_legacy() {
            write!(f, "Salt(legacy)")
        } else {
            write!(f, "Salt({})", self.to_base64())
        }
    }
}

/// Derive an AES-256 key from a passphrase and salt.
///
/// # Preconditions
/// - `passphrase` must not be empty
/// - `params.iterations` must be non-zero
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Security
/// - Passphrase is not stored or logged
pub fn derive_key(passphrase: &[u8], salt: &Salt, params: &KdfParams) -> Result<CipherKey> {
    if passphrase.is_empty() {
        return Err(Error::InvalidInput("Passphrase cannot be empty".to_string()));
    }
    if params.iterations == 0 {
        return Err(Error::Crypto("Invalid KDF parameters: zero iterations".to_string()));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(passphrase, salt.as_bytes(), params.iterations, &mut key_bytes);

    Ok(CipherKey::from_bytes(key_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> KdfParams {
        KdfParams::with_iterations(1_000)
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = Salt::legacy();
        let key1 = derive_key(b"vault-password", &salt, &fast()).unwrap();
        let key2 = derive_key(b"vault-password", &salt, &fast()).unwrap();
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_derive_key_different_salt() {
        let key1 = derive_key(b"vault-password", &Salt::legacy(), &fast()).unwrap();
        let key2 = derive_key(b"vault-password", &Salt::generate(), &fast()).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_derive_key_different_passphrase() {
        let salt = Salt::legacy();
        let key1 = derive_key(b"password1", &salt, &fast()).unwrap();
        let key2 = derive_key(b"password2", &salt, &fast()).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_derive_key_empty_passphrase_fails() {
        assert!(matches!(
            derive_key(b"", &Salt::legacy(), &fast()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_pbkdf2_sha256_reference_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256 with 1 round.
        let salt = Salt::from_bytes(b"salt".to_vec()).unwrap();
        let key = derive_key(b"passwd", &salt, &KdfParams::with_iterations(1)).unwrap();
        assert_eq!(
            &key.as_bytes()[..8],
            &[0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]
        );
    }

    #[test]
    fn test_salt_base64_roundtrip() {
        let salt = Salt::generate();
        assert_eq!(salt.as_bytes().len(), SALT_LENGTH);
        let parsed = Salt::from_base64(&salt.to_base64()).unwrap();
        assert_eq!(parsed, salt);
        assert!(!parsed.is_legacy());
        assert!(Salt::legacy().is_legacy());
    }

    #[test]
    fn test_salt_generate_is_random() {
        assert_ne!(Salt::generate(), Salt::generate());
    }

    #[test]
    fn test_salt_rejects_bad_input() {
        assert!(Salt::from_base64("***").is_err());
        assert!(Salt::from_base64("").is_err());
    }
}
