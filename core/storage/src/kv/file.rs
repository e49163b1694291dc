//! Directory-backed key-value store.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use safebox_common::{Error, Result};

use super::KeyValueStore;

/// Key-value store keeping one file per key inside a directory.
///
/// File names are the URL-safe base64 of the key, so any key string is
/// representable. Writes go to a temporary file first and are renamed
/// into place.
#[derive(Debug, Clone)]
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(URL_SAFE_NO_PAD.encode(key.as_bytes()))
    }

    fn decode_name(name: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(name).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl KeyValueStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.entry_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        let target = self.entry_path(key);
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, value)?;
        fs::rename(&tmp, &target)
            .map_err(|e| Error::Storage(format!("Failed to store key {}: {}", key, e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.ends_with(".tmp") {
                continue;
            }
            if let Some(key) = Self::decode_name(name) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
