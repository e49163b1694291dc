//! Handing an exported archive to the user.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use safebox_common::{Error, Result};

/// File name offered for exported archives.
pub const SUGGESTED_FILE_NAME: &str = "safebox-vault.zip";

/// A way of saving bytes under a suggested name.
#[async_trait]
pub trait SaveCapability: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn save(&self, suggested_name: &str, bytes: &[u8]) -> Result<()>;
}

/// Which capability ended up saving the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Native,
    Fallback,
}

/// Try the native save capability, then the fallback.
///
/// A missing native capability goes straight to the fallback. The error
/// of the fallback is returned when both fail.
pub async fn deliver(
    bytes: &[u8],
    native: Option<&dyn SaveCapability>,
    fallback: &dyn SaveCapability,
) -> Result<Delivery> {
    if let Some(native) = native {
        match native.save(SUGGESTED_FILE_NAME, bytes).await {
            Ok(()) => {
                info!(via = native.name(), bytes = bytes.len(), "Saved archive");
                return Ok(Delivery::Native);
            }
            Err(e) => warn!(via = native.name(), error = %e, "Native save failed, falling back"),
        }
    }
    fallback.save(SUGGESTED_FILE_NAME, bytes).await?;
    info!(via = fallback.name(), bytes = bytes.len(), "Saved archive");
    Ok(Delivery::Fallback)
}

/// Saves into a file. A directory target receives the suggested name.
pub struct FileSave {
    target: PathBuf,
}

impl FileSave {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    async fn resolve(&self, suggested_name: &str) -> PathBuf {
        match tokio::fs::metadata(&self.target).await {
            Ok(meta) if meta.is_dir() => self.target.join(suggested_name),
            _ => self.target.clone(),
        }
    }
}

#[async_trait]
impl SaveCapability for FileSave {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, suggested_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(suggested_name).await;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder {
        fail: bool,
        saved: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SaveCapability for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn save(&self, suggested_name: &str, _bytes: &[u8]) -> Result<()> {
            if self.fail {
                return Err(Error::NotImplemented("save picker".into()));
            }
            self.saved.lock().unwrap().push(suggested_name.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_native_preferred() {
        let native = Recorder::new(false);
        let fallback = Recorder::new(false);
        let via = deliver(b"zip", Some(&native), &fallback).await.unwrap();
        assert_eq!(via, Delivery::Native);
        assert_eq!(*native.saved.lock().unwrap(), vec![SUGGESTED_FILE_NAME]);
        assert!(fallback.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let native = Recorder::new(true);
        let fallback = Recorder::new(false);
        let via = deliver(b"zip", Some(&native), &fallback).await.unwrap();
        assert_eq!(via, Delivery::Fallback);
        assert_eq!(fallback.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_without_native() {
        let fallback = Recorder::new(false);
        assert_eq!(deliver(b"zip", None, &fallback).await.unwrap(), Delivery::Fallback);
    }

    #[tokio::test]
    async fn test_file_save_into_directory() {
        let dir = TempDir::new().unwrap();
        let via = deliver(b"zip", None, &FileSave::new(dir.path())).await.unwrap();
        assert_eq!(via, Delivery::Fallback);
        let written = std::fs::read(dir.path().join(SUGGESTED_FILE_NAME)).unwrap();
        assert_eq!(written, b"zip");
    }
}
