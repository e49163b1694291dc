//! Password-based symmetric method (AES-256-GCM over PBKDF2).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

use super::config::{MethodConfig, SYMMETRIC};
use super::{require, EncryptionMethod, MethodFactory};
use crate::engine::CipherEngine;
use crate::kdf::{KdfParams, Salt};
use safebox_common::{Error, Result};

/// Symmetric method backed by the cipher engine.
///
/// The key is derived lazily on first use and reused afterwards.
pub struct SymmetricMethod {
    name: String,
    passphrase: Zeroizing<String>,
    salt: Salt,
    params: KdfParams,
    engine: OnceCell<CipherEngine>,
}

impl SymmetricMethod {
    /// Create a method from its parts.
    pub fn new(name: impl Into<String>, passphrase: &str, salt: Salt) -> Self {
        Self::with_params(name, passphrase, salt, KdfParams::standard())
    }

    /// Create a method with explicit KDF parameters.
    pub fn with_params(
        name: impl Into<String>,
        passphrase: &str,
        salt: Salt,
        params: KdfParams,
    ) -> Self {
        Self {
            name: name.into(),
            passphrase: Zeroizing::new(passphrase.to_string()),
            salt,
            params,
            engine: OnceCell::new(),
        }
    }

    async fn engine(&self) -> Result<&CipherEngine> {
        self.engine
            .get_or_try_init(|| {
                CipherEngine::derive_with_params(&self.passphrase, self.salt.clone(), self.params)
            })
            .await
    }
}

#[async_trait]
impl EncryptionMethod for SymmetricMethod {
    fn kind(&self) -> &'static str {
        SYMMETRIC
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn encrypt(&self, data: &[u8]) -> Result<String> {
        self.engine().await?.encrypt(data)
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>> {
        self.engine().await?.decrypt(ciphertext)
    }
}

/// Factory for [`SymmetricMethod`].
#[derive(Debug, Default)]
pub struct SymmetricFactory;

impl SymmetricFactory {
    fn salt_of(salt: &Option<String>) -> Result<Salt> {
        match salt {
            Some(encoded) => Salt::from_base64(encoded)
                .map_err(|_| Error::ConfigValidation("'salt' must be non-empty base64".to_string())),
            None => Ok(Salt::legacy()),
        }
    }
}

impl MethodFactory for SymmetricFactory {
    fn kind(&self) -> &'static str {
        SYMMETRIC
    }

    fn label(&self) -> &'static str {
        "AES-256"
    }

    fn default_config(&self) -> MethodConfig {
        MethodConfig::Symmetric {
            name: String::new(),
            passphrase: String::new(),
            salt: Some(Salt::generate().to_base64()),
        }
    }

    fn validate(&self, config: &MethodConfig) -> Result<()> {
        match config {
            MethodConfig::Symmetric {
                name,
                passphrase,
                salt,
            } => {
                require("name", name)?;
                require("passphrase", passphrase)?;
                Self::salt_of(salt)?;
                Ok(())
            }
            other => Err(Error::ConfigValidation(format!(
                "expected a {} config, got {}",
                SYMMETRIC,
                other.kind()
            ))),
        }
    }

    fn create(&self, config: &MethodConfig) -> Result<Arc<dyn EncryptionMethod>> {
        self.validate(config)?;
        match config {
            MethodConfig::Symmetric {
                name,
                passphrase,
                salt,
            } => Ok(Arc::new(SymmetricMethod::new(
                name.clone(),
                passphrase,
                Self::salt_of(salt)?,
            ))),
            other => Err(Error::ConfigValidation(format!(
                "expected a {} config, got {}",
                SYMMETRIC,
                other.kind()
            ))),
        }
    }
}
