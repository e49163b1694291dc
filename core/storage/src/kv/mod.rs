//! Persistent key-value storage.
//!
//! The key-value store backs the local source, the configuration lists
//! and the persisted vault index.

mod file;
mod memory;

pub use file::FileKv;
pub use memory::MemoryKv;

use safebox_common::Result;

/// Synchronous string-keyed byte store.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Check if `key` is present.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
