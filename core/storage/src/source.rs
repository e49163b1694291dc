//! Storage source trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use safebox_common::{Result, SourcePath};

/// Kind of an item listed by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceEntryKind {
    File,
    Folder,
}

/// An item listed by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Name of the item.
    pub name: String,
    /// File or folder.
    pub kind: SourceEntryKind,
    /// Full path of the item within the source.
    pub path: SourcePath,
    /// Size in bytes (None for folders or when the backend does not say).
    pub size: Option<u64>,
    /// Last modification time, when known.
    pub modified: Option<DateTime<Utc>>,
}

impl SourceEntry {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == SourceEntryKind::Folder
    }
}

/// Byte transport for one configured storage location.
///
/// Sources move opaque bytes only; they never encrypt or decrypt.
#[async_trait]
pub trait Source: Send + Sync {
    /// Type discriminant (e.g., "local", "remote-api").
    fn kind(&self) -> &'static str;

    /// Configured name of this source.
    fn name(&self) -> &str;

    /// List the direct children of a folder.
    ///
    /// # Errors
    /// - Folder not found
    /// - Backend connectivity errors
    async fn list(&self, path: &SourcePath) -> Result<Vec<SourceEntry>>;

    /// Read the complete content of a file.
    ///
    /// # Errors
    /// - File not found
    async fn read(&self, path: &SourcePath) -> Result<Vec<u8>>;

    /// Create or replace a file.
    ///
    /// # Preconditions
    /// - Parent folder must exist
    async fn write(&self, path: &SourcePath, data: Vec<u8>) -> Result<()>;

    /// Create a folder.
    ///
    /// # Errors
    /// - Parent folder not found
    /// - Already exists
    async fn create_folder(&self, path: &SourcePath) -> Result<()>;
}
