//! Pluggable encryption methods.
//!
//! A method turns plaintext bytes into ciphertext text and back. Each
//! variant is described by a [`MethodConfig`] and built by a
//! [`MethodFactory`] registered under the config's `type` discriminant, so
//! new variants plug in through the [`MethodRegistry`] without touching
//! call sites.

pub mod config;
pub mod placeholder;
pub mod registry;
pub mod symmetric;

use async_trait::async_trait;
use std::sync::Arc;

use safebox_common::Result;

pub use config::{MethodConfig, ALTERNATIVE, ASYMMETRIC_KEY, SYMMETRIC};
pub use placeholder::{AlternativeFactory, AlternativeMethod, AsymmetricKeyFactory, AsymmetricKeyMethod};
pub use registry::MethodRegistry;
pub use symmetric::{SymmetricFactory, SymmetricMethod};

/// A configured encryption method instance.
#[async_trait]
pub trait EncryptionMethod: Send + Sync {
    /// Type discriminant (e.g., "symmetric").
    fn kind(&self) -> &'static str;

    /// User-facing name of the configured method.
    fn name(&self) -> &str;

    /// Encrypt bytes into ciphertext text.
    ///
    /// # Errors
    /// - `NotImplemented` for placeholder variants
    /// - Cipher errors from the underlying engine
    async fn encrypt(&self, data: &[u8]) -> Result<String>;

    /// Decrypt ciphertext text back into bytes.
    ///
    /// # Errors
    /// - `NotImplemented` for placeholder variants
    /// - `MalformedCiphertext` / `AuthenticationFailure` from the cipher
    async fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>>;
}

/// Builds and validates one method variant.
pub trait MethodFactory: Send + Sync {
    /// Type discriminant this factory handles.
    fn kind(&self) -> &'static str;

    /// Human readable label.
    fn label(&self) -> &'static str;

    /// Canonical empty configuration for this variant.
    fn default_config(&self) -> MethodConfig;

    /// Check required fields.
    ///
    /// # Errors
    /// - `ConfigValidation` naming the first problem found
    fn validate(&self, config: &MethodConfig) -> Result<()>;

    /// Create a method instance from a validated configuration.
    fn create(&self, config: &MethodConfig) -> Result<Arc<dyn EncryptionMethod>>;
}

/// Reject blank required fields.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(safebox_common::Error::ConfigValidation(format!(
            "'{}' is required",
            field
        )));
    }
    Ok(())
}
