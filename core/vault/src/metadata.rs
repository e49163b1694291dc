//! Sealed entry metadata.

use serde::{Deserialize, Serialize};

use safebox_common::{Error, Result};
use safebox_crypto::EncryptionMethod;

/// Tags and notes stored together inside one encrypted blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMetadata {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SealedMetadata {
    pub fn new(tags: Vec<String>, notes: Option<String>) -> Self {
        Self { tags, notes }
    }

    /// Encrypt as JSON through `method`.
    pub async fn seal(&self, method: &dyn EncryptionMethod) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        method.encrypt(&json).await
    }

    /// Decrypt a blob produced by [`SealedMetadata::seal`].
    pub async fn unseal(method: &dyn EncryptionMethod, sealed: &str) -> Result<Self> {
        let json = method.decrypt(sealed).await?;
        serde_json::from_slice(&json)
            .map_err(|e| Error::Serialization(format!("Invalid sealed metadata: {}", e)))
    }
}
