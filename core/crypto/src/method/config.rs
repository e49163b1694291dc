//! Encryption method configuration shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of the password-based symmetric method.
pub const SYMMETRIC: &str = "symmetric";
/// Discriminant of the asymmetric-key placeholder method.
pub const ASYMMETRIC_KEY: &str = "asymmetric-key";
/// Discriminant of the alternative placeholder method.
pub const ALTERNATIVE: &str = "alternative";

/// Tagged union of encryption method configurations.
///
/// Serialized as `{"name": ..., "type": "symmetric", ...}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MethodConfig {
    /// AES-256-GCM keyed from a passphrase.
    Symmetric {
        name: String,
        passphrase: String,
        /// Base64 salt; absent means the legacy fixed salt.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        salt: Option<String>,
    },
    /// Public-key scheme, not implemented.
    #[serde(rename_all = "camelCase")]
    AsymmetricKey {
        name: String,
        private_key: String,
        passphrase: String,
    },
    /// Alternative passphrase scheme, not implemented.
    Alternative { name: String, passphrase: String },
}

impl MethodConfig {
    /// Configured name.
    pub fn name(&self) -> &str {
        match self {
            MethodConfig::Symmetric { name, .. }
            | MethodConfig::AsymmetricKey { name, .. }
            | MethodConfig::Alternative { name, .. } => name,
        }
    }

    /// Type discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            MethodConfig::Symmetric { .. } => SYMMETRIC,
            MethodConfig::AsymmetricKey { .. } => ASYMMETRIC_KEY,
            MethodConfig::Alternative { .. } => ALTERNATIVE,
        }
    }

    /// Return a copy with a different name.
    pub fn renamed(&self, new_name: impl Into<String>) -> Self {
        let mut config = self.clone();
        match &mut config {
            MethodConfig::Symmetric { name, .. }
            | MethodConfig::AsymmetricKey { name, .. }
            | MethodConfig::Alternative { name, .. } => *name = new_name.into(),
        }
        config
    }
}

impl fmt::Debug for MethodConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodConfig")
            .field("type", &self.kind())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
