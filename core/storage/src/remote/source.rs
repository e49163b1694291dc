//! Remote-API source.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::REMOTE_API;
use crate::source::{Source, SourceEntry, SourceEntryKind};
use safebox_common::{Error, Result, SourcePath};

use super::client::{FolderListing, RemoteClient, ROOT_FOLDER_ID};

/// Source stored on the remote backend below a configured root folder.
///
/// The root folder is `/`, a slash path walked from the account's top
/// folder, or a raw backend folder id.
pub struct RemoteApiSource {
    name: String,
    client: RemoteClient,
    root_folder: String,
    /// Source path to backend folder id.
    path_cache: RwLock<HashMap<String, String>>,
}

impl RemoteApiSource {
    pub fn new(name: impl Into<String>, client: RemoteClient, root_folder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            client,
            root_folder: root_folder.into(),
            path_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, key: &str) -> Option<String> {
        self.path_cache.read().await.get(key).cloned()
    }

    async fn cache(&self, key: String, id: String) {
        self.path_cache.write().await.insert(key, id);
    }

    /// Find the child folder `name` of `parent_id`.
    async fn child_folder(&self, parent_id: &str, name: &str) -> Result<String> {
        let listing = self.client.list_folder(parent_id).await?;
        listing
            .folder(name)
            .map(|f| f.folder_id.clone())
            .ok_or_else(|| Error::NotFound(format!("Folder \"{}\" not found", name)))
    }

    /// Backend id of the configured root folder.
    async fn root_id(&self) -> Result<String> {
        if let Some(id) = self.cached("/").await {
            return Ok(id);
        }

        let id = match self.root_folder.trim() {
            "" | "/" => ROOT_FOLDER_ID.to_string(),
            path if path.starts_with('/') => {
                let mut current = ROOT_FOLDER_ID.to_string();
                for segment in path.split('/').filter(|s| !s.is_empty()) {
                    current = self.child_folder(&current, segment).await?;
                }
                current
            }
            id => id.to_string(),
        };

        self.cache("/".to_string(), id.clone()).await;
        Ok(id)
    }

    /// Resolve a folder path to its backend id by walking each segment.
    async fn resolve_folder(&self, path: &SourcePath) -> Result<String> {
        let key = path.to_string_path();
        if let Some(id) = self.cached(&key).await {
            return Ok(id);
        }

        let mut current_id = self.root_id().await?;
        let mut current_path = SourcePath::root();

        for component in path.components() {
            current_path = current_path.join(component)?;
            let current_key = current_path.to_string_path();

            if let Some(id) = self.cached(&current_key).await {
                current_id = id;
                continue;
            }

            current_id = self.child_folder(&current_id, component).await?;
            self.cache(current_key, current_id.clone()).await;
        }

        Ok(current_id)
    }

    /// Resolve the parent folder of `path`, returning `(parent_id, name)`.
    async fn resolve_parent(&self, path: &SourcePath) -> Result<(String, String)> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::InvalidInput("Cannot get parent of root path".to_string()))?;
        let name = path
            .name()
            .ok_or_else(|| Error::InvalidInput("Path has no name component".to_string()))?
            .to_string();

        let parent_id = self.resolve_folder(&parent).await?;
        Ok((parent_id, name))
    }

    async fn listing_of_parent(&self, path: &SourcePath) -> Result<(String, String, FolderListing)> {
        let (parent_id, name) = self.resolve_parent(path).await?;
        let listing = self.client.list_folder(&parent_id).await?;
        Ok((parent_id, name, listing))
    }
}

#[async_trait]
impl Source for RemoteApiSource {
    fn kind(&self) -> &'static str {
        REMOTE_API
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, path: &SourcePath) -> Result<Vec<SourceEntry>> {
        let folder_id = self.resolve_folder(path).await?;
        let listing = self.client.list_folder(&folder_id).await?;

        let mut entries = Vec::with_capacity(listing.folders.len() + listing.files.len());
        for folder in listing.folders {
            let child = path.join(&folder.name)?;
            self.cache(child.to_string_path(), folder.folder_id).await;
            entries.push(SourceEntry {
                name: folder.name,
                kind: SourceEntryKind::Folder,
                path: child,
                size: None,
                modified: None,
            });
        }
        for file in listing.files {
            entries.push(SourceEntry {
                path: path.join(&file.name)?,
                kind: SourceEntryKind::File,
                size: file.size,
                modified: file.modified(),
                name: file.name,
            });
        }

        debug!(source = %self.name, path = %path, entries = entries.len(), "Listed remote folder");
        Ok(entries)
    }

    async fn read(&self, path: &SourcePath) -> Result<Vec<u8>> {
        let (_, name, listing) = self.listing_of_parent(path).await?;
        let file = listing
            .file(&name)
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", path)))?;
        self.client.download(&file.file_id).await
    }

    async fn write(&self, path: &SourcePath, data: Vec<u8>) -> Result<()> {
        let (parent_id, name) = self.resolve_parent(path).await?;
        let file_id = self.client.upload(&parent_id, &name, &data).await?;
        debug!(source = %self.name, path = %path, file_id = %file_id, bytes = data.len(), "Uploaded file");
        Ok(())
    }

    async fn create_folder(&self, path: &SourcePath) -> Result<()> {
        let (parent_id, name, listing) = self.listing_of_parent(path).await?;
        if listing.folder(&name).is_some() {
            return Err(Error::AlreadyExists(format!("Folder already exists: {}", path)));
        }
        if listing.file(&name).is_some() {
            return Err(Error::AlreadyExists(format!("File exists at {}", path)));
        }

        let folder_id = self.client.create_folder(&parent_id, &name).await?;
        self.cache(path.to_string_path(), folder_id).await;
        Ok(())
    }
}
