//! Placeholder method variants.
//!
//! These variants can be configured and validated, but their cipher
//! operations fail with `NotImplemented` so callers can tell them apart
//! from genuine cryptographic failures.

use async_trait::async_trait;
use std::sync::Arc;

use super::config::{MethodConfig, ALTERNATIVE, ASYMMETRIC_KEY};
use super::{require, EncryptionMethod, MethodFactory};
use safebox_common::{Error, Result};

/// Public-key method (GPG-style), not implemented.
#[derive(Debug)]
pub struct AsymmetricKeyMethod {
    name: String,
}

#[async_trait]
impl EncryptionMethod for AsymmetricKeyMethod {
    fn kind(&self) -> &'static str {
        ASYMMETRIC_KEY
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn encrypt(&self, _data: &[u8]) -> Result<String> {
        Err(Error::NotImplemented(format!(
            "{} encryption for method '{}'",
            ASYMMETRIC_KEY, self.name
        )))
    }

    async fn decrypt(&self, _ciphertext: &str) -> Result<Vec<u8>> {
        Err(Error::NotImplemented(format!(
            "{} decryption for method '{}'",
            ASYMMETRIC_KEY, self.name
        )))
    }
}

/// Factory for [`AsymmetricKeyMethod`].
#[derive(Debug, Default)]
pub struct AsymmetricKeyFactory;

impl MethodFactory for AsymmetricKeyFactory {
    fn kind(&self) -> &'static str {
        ASYMMETRIC_KEY
    }

    fn label(&self) -> &'static str {
        "GPG"
    }

    fn default_config(&self) -> MethodConfig {
        MethodConfig::AsymmetricKey {
            name: String::new(),
            private_key: String::new(),
            passphrase: String::new(),
        }
    }

    fn validate(&self, config: &MethodConfig) -> Result<()> {
        match config {
            MethodConfig::AsymmetricKey {
                name,
                private_key,
                passphrase,
            } => {
                require("name", name)?;
                require("privateKey", private_key)?;
                require("passphrase", passphrase)
            }
            other => Err(Error::ConfigValidation(format!(
                "expected a {} config, got {}",
                ASYMMETRIC_KEY,
                other.kind()
            ))),
        }
    }

    fn create(&self, config: &MethodConfig) -> Result<Arc<dyn EncryptionMethod>> {
        self.validate(config)?;
        Ok(Arc::new(AsymmetricKeyMethod {
            name: config.name().to_string(),
        }))
    }
}

/// Alternative passphrase method (age-style), not implemented.
#[derive(Debug)]
pub struct AlternativeMethod {
    name: String,
}

#[async_trait]
impl EncryptionMethod for AlternativeMethod {
    fn kind(&self) -> &'static str {
        ALTERNATIVE
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn encrypt(&self, _data: &[u8]) -> Result<String> {
        Err(Error::NotImplemented(format!(
            "{} encryption for method '{}'",
            ALTERNATIVE, self.name
        )))
    }

    async fn decrypt(&self, _ciphertext: &str) -> Result<Vec<u8>> {
        Err(Error::NotImplemented(format!(
            "{} decryption for method '{}'",
            ALTERNATIVE, self.name
        )))
    }
}

/// Factory for [`AlternativeMethod`].
#[derive(Debug, Default)]
pub struct AlternativeFactory;

impl MethodFactory for AlternativeFactory {
    fn kind(&self) -> &'static str {
        ALTERNATIVE
    }

    fn label(&self) -> &'static str {
        "age"
    }

    fn default_config(&self) -> MethodConfig {
        MethodConfig::Alternative {
            name: String::new(),
            passphrase: String::new(),
        }
    }

    fn validate(&self, config: &MethodConfig) -> Result<()> {
        match config {
            MethodConfig::Alternative { name, passphrase } => {
                require("name", name)?;
                require("passphrase", passphrase)
            }
            other => Err(Error::ConfigValidation(format!(
                "expected an {} config, got {}",
                ALTERNATIVE,
                other.kind()
            ))),
        }
    }

    fn create(&self, config: &MethodConfig) -> Result<Arc<dyn EncryptionMethod>> {
        self.validate(config)?;
        Ok(Arc::new(AlternativeMethod {
            name: config.name().to_string(),
        }))
    }
}
