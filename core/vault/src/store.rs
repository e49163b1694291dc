//! Shared entry state for every source.
//!
//! Each source's list is an immutable `Arc<SourceEntries>` that is
//! replaced wholesale on every change, so readers always hold a consistent
//! snapshot. Async read-modify-write paths hold the writer guard for
//! their whole duration; synchronous mutations do not take it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, info};

use safebox_common::{Error, Result, SourceIndex};
use safebox_storage::KeyValueStore;

use crate::entries::SourceEntries;

/// Key-value key holding the persisted entry lists.
pub const VAULT_KEY: &str = "vault";

#[derive(Serialize, Deserialize)]
struct PersistedSource {
    index: SourceIndex,
    entries: SourceEntries,
}

/// Entry lists of all sources.
pub struct VaultStore {
    sources: RwLock<BTreeMap<SourceIndex, Arc<SourceEntries>>>,
    writer: Mutex<()>,
    revision: watch::Sender<u64>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("Vault store lock poisoned".to_string())
}

impl VaultStore {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
            writer: Mutex::new(()),
            revision: watch::Sender::new(0),
        }
    }

    /// Serialize async read-modify-write sequences.
    pub async fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Receiver bumped after every committed change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Current list of a source. Unknown sources are empty.
    pub fn snapshot(&self, index: SourceIndex) -> Result<Arc<SourceEntries>> {
        let sources = self.sources.read().map_err(poisoned)?;
        Ok(sources.get(&index).cloned().unwrap_or_default())
    }

    /// Current lists of every source holding state.
    pub fn snapshot_all(&self) -> Result<BTreeMap<SourceIndex, Arc<SourceEntries>>> {
        Ok(self.sources.read().map_err(poisoned)?.clone())
    }

    pub fn source_indices(&self) -> Result<Vec<SourceIndex>> {
        Ok(self.sources.read().map_err(poisoned)?.keys().copied().collect())
    }

    /// Apply `f` to a copy of the source's list and publish the copy.
    ///
    /// On error nothing is published.
    pub fn mutate<T, F>(&self, index: SourceIndex, f: F) -> Result<T>
    where
        F: FnOnce(&mut SourceEntries) -> Result<T>,
    {
        let value = {
            let mut sources = self.sources.write().map_err(poisoned)?;
            let mut next = sources
                .get(&index)
                .map(|current| current.as_ref().clone())
                .unwrap_or_default();
            let value = f(&mut next)?;
            sources.insert(index, Arc::new(next));
            value
        };
        self.bump();
        Ok(value)
    }

    /// Replace a source's list.
    pub fn replace(&self, index: SourceIndex, entries: SourceEntries) -> Result<()> {
        self.sources
            .write()
            .map_err(poisoned)?
            .insert(index, Arc::new(entries));
        self.bump();
        Ok(())
    }

    /// Overwrite the given sources, leaving all others untouched.
    pub fn merge(&self, incoming: BTreeMap<SourceIndex, SourceEntries>) -> Result<()> {
        {
            let mut sources = self.sources.write().map_err(poisoned)?;
            for (index, entries) in incoming {
                sources.insert(index, Arc::new(entries));
            }
        }
        self.bump();
        Ok(())
    }

    /// Put back lists taken with [`VaultStore::snapshot_all`].
    pub fn reset_to(&self, saved: BTreeMap<SourceIndex, Arc<SourceEntries>>) -> Result<()> {
        *self.sources.write().map_err(poisoned)? = saved;
        self.bump();
        Ok(())
    }

    /// Drop a source and shift later sources down by one.
    pub fn remove_source(&self, index: SourceIndex) -> Result<()> {
        {
            let mut sources = self.sources.write().map_err(poisoned)?;
            let current = std::mem::take(&mut *sources);
            for (idx, entries) in current {
                if idx < index {
                    sources.insert(idx, entries);
                } else if idx > index {
                    sources.insert(SourceIndex(idx.0 - 1), entries);
                }
            }
        }
        self.bump();
        Ok(())
    }

    /// Write every list, without caches, under [`VAULT_KEY`].
    pub fn persist(&self, kv: &dyn KeyValueStore) -> Result<()> {
        let persisted: Vec<PersistedSource> = self
            .snapshot_all()?
            .into_iter()
            .map(|(index, entries)| PersistedSource {
                index,
                entries: entries.durable(),
            })
            .collect();

        let json = serde_json::to_vec(&persisted)?;
        kv.set(VAULT_KEY, &json)?;
        debug!(sources = persisted.len(), "Persisted vault state");
        Ok(())
    }

    /// Replace all state with what [`VaultStore::persist`] wrote.
    ///
    /// A missing key leaves the store empty.
    pub fn restore(&self, kv: &dyn KeyValueStore) -> Result<()> {
        let Some(json) = kv.get(VAULT_KEY)? else {
            return Ok(());
        };
        let persisted: Vec<PersistedSource> = serde_json::from_slice(&json)
            .map_err(|e| Error::Serialization(format!("Invalid vault state: {}", e)))?;

        let restored: BTreeMap<_, _> = persisted
            .into_iter()
            .map(|p| (p.index, Arc::new(p.entries)))
            .collect();
        info!(sources = restored.len(), "Restored vault state");

        *self.sources.write().map_err(poisoned)? = restored;
        self.bump();
        Ok(())
    }
}

impl Default for VaultStore {
    fn default() -> Self {
        Self::new()
    }
}
