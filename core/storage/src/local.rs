//! Local source backed by a key-value store.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::kv::KeyValueStore;
use crate::source::{Source, SourceEntry, SourceEntryKind};
use crate::config::LOCAL;
use safebox_common::{Error, Result, SourcePath};

const FILE_PREFIX: &str = "local-file-";
const DIR_PREFIX: &str = "local-dir-";

/// Local source.
///
/// Files live under `local-file-<path>` and folder markers under
/// `local-dir-<path>`. The root folder always exists.
pub struct LocalSource {
    name: String,
    kv: Arc<dyn KeyValueStore>,
}

impl LocalSource {
    /// Create a local source over the given store.
    pub fn new(name: impl Into<String>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            name: name.into(),
            kv,
        }
    }

    fn file_key(path: &SourcePath) -> String {
        format!("{}{}", FILE_PREFIX, path.to_string_path())
    }

    fn dir_key(path: &SourcePath) -> String {
        format!("{}{}", DIR_PREFIX, path.to_string_path())
    }

    fn folder_exists(&self, path: &SourcePath) -> Result<bool> {
        if path.is_root() {
            return Ok(true);
        }
        self.kv.contains(&Self::dir_key(path))
    }

    fn require_parent(&self, path: &SourcePath) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::InvalidInput("Root has no parent".to_string()))?;
        if !self.folder_exists(&parent)? {
            return Err(Error::NotFound(format!("Folder not found: {}", parent)));
        }
        Ok(())
    }

    /// Direct children of `folder` among keys carrying `prefix`.
    fn children(&self, prefix: &str, folder: &SourcePath) -> Result<Vec<String>> {
        let scope = if folder.is_root() {
            format!("{}/", prefix)
        } else {
            format!("{}{}/", prefix, folder.to_string_path())
        };
        Ok(self
            .kv
            .keys(&scope)?
            .into_iter()
            .filter_map(|key| {
                let rest = &key[scope.len()..];
                (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
            })
            .collect())
    }
}

#[async_trait]
impl Source for LocalSource {
    fn kind(&self) -> &'static str {
        LOCAL
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, path: &SourcePath) -> Result<Vec<SourceEntry>> {
        if !self.folder_exists(path)? {
            return Err(Error::NotFound(format!("Folder not found: {}", path)));
        }

        let mut entries = Vec::new();
        for name in self.children(DIR_PREFIX, path)? {
            entries.push(SourceEntry {
                path: path.join(&name)?,
                name,
                kind: SourceEntryKind::Folder,
                size: None,
                modified: None,
            });
        }
        for name in self.children(FILE_PREFIX, path)? {
            let child = path.join(&name)?;
            let size = self.kv.get(&Self::file_key(&child))?.map(|d| d.len() as u64);
            entries.push(SourceEntry {
                path: child,
                name,
                kind: SourceEntryKind::File,
                size,
                modified: None,
            });
        }

        debug!(source = %self.name, path = %path, entries = entries.len(), "Listed local folder");
        Ok(entries)
    }

    async fn read(&self, path: &SourcePath) -> Result<Vec<u8>> {
        self.kv
            .get(&Self::file_key(path))?
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", path)))
    }

    async fn write(&self, path: &SourcePath, data: Vec<u8>) -> Result<()> {
        if path.is_root() {
            return Err(Error::InvalidInput("Cannot write to the root folder".to_string()));
        }
        self.require_parent(path)?;
        if self.kv.contains(&Self::dir_key(path))? {
            return Err(Error::AlreadyExists(format!("Folder exists at {}", path)));
        }
        self.kv.set(&Self::file_key(path), &data)
    }

    async fn create_folder(&self, path: &SourcePath) -> Result<()> {
        if self.folder_exists(path)? {
            return Err(Error::AlreadyExists(format!("Folder already exists: {}", path)));
        }
        self.require_parent(path)?;
        if self.kv.contains(&Self::file_key(path))? {
            return Err(Error::AlreadyExists(format!("File exists at {}", path)));
        }
        self.kv.set(&Self::dir_key(path), b"")
    }
}
