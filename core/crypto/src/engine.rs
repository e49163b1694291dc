//! Passphrase-keyed cipher engine.
//!
//! Key stretching is deliberately slow, so an engine derives its key once
//! on the blocking pool and then encrypts or decrypts any number of
//! buffers with it.

use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

use crate::aead;
use crate::kdf::{derive_key, KdfParams, Salt};
use crate::keys::CipherKey;
use safebox_common::{Error, Result};

/// A derived key bound to the salt it was derived with.
#[derive(Clone)]
pub struct CipherEngine {
    key: Arc<CipherKey>,
    salt: Salt,
}

impl CipherEngine {
    /// Derive an engine from a passphrase using the standard parameters.
    pub async fn derive(passphrase: &str, salt: Salt) -> Result<Self> {
        Self::derive_with_params(passphrase, salt, KdfParams::standard()).await
    }

    /// Derive an engine with explicit KDF parameters.
    ///
    /// The derivation runs on tokio's blocking pool.
    pub async fn derive_with_params(
        passphrase: &str,
        salt: Salt,
        params: KdfParams,
    ) -> Result<Self> {
        let passphrase = Zeroizing::new(passphrase.as_bytes().to_vec());
        let kdf_salt = salt.clone();

        let key = tokio::task::spawn_blocking(move || {
            derive_key(passphrase.as_slice(), &kdf_salt, &params)
        })
        .await
        .map_err(|e| Error::Crypto(format!("Key derivation task failed: {}", e)))??;

        debug!(iterations = params.iterations, legacy_salt = salt.is_legacy(), "Derived cipher key");

        Ok(Self {
            key: Arc::new(key),
            salt,
        })
    }

    /// Build an engine around an already derived key.
    pub fn from_key(key: CipherKey, salt: Salt) -> Self {
        Self {
            key: Arc::new(key),
            salt,
        }
    }

    /// Salt the key was derived with.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Encrypt bytes into framed ciphertext text.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        aead::seal(&self.key, plaintext)
    }

    /// Decrypt framed ciphertext text.
    pub fn decrypt(&self, framed: &str) -> Result<Vec<u8>> {
        aead::open(&self.key, framed)
    }
}

impl std::fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherEngine")
            .field("key", &"[REDACTED]")
            .field("salt", &self.salt)
            .finish()
    }
}

/// Encrypt with a passphrase and the legacy salt.
pub async fn encrypt_with_passphrase(plaintext: &[u8], passphrase: &str) -> Result<String> {
    CipherEngine::derive(passphrase, Salt::legacy())
        .await?
        .encrypt(plaintext)
}

/// Decrypt with a passphrase and the legacy salt.
pub async fn decrypt_with_passphrase(framed: &str, passphrase: &str) -> Result<Vec<u8>> {
    CipherEngine::derive(passphrase, Salt::legacy())
        .await?
        .decrypt(framed)
}
