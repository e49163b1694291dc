//! Vault facade.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use safebox_common::{EntryId, Error, Result, SensitiveBytes, SourceIndex, SourcePath};
use safebox_crypto::{EncryptionMethod, MethodConfig, MethodRegistry};
use safebox_storage::{Source, SourceConfig, SourceContext, SourceRegistry};

use crate::bulk::{run_bulk, BulkOptions, BulkReport, ItemOutcome};
use crate::config::ConfigService;
use crate::entries::SourceEntries;
use crate::entry::{EntryKind, FileEntry, PlaintextCache};
use crate::metadata::SealedMetadata;
use crate::store::VaultStore;

type CachedMethod = (MethodConfig, Arc<dyn EncryptionMethod>);

/// Configuration, registries and entry state of one vault.
///
/// Payload operations resolve the encryption method configured for the
/// entry's source by name on every call, so configuration changes apply
/// immediately.
pub struct Vault {
    config: ConfigService,
    methods: Arc<MethodRegistry>,
    sources: Arc<SourceRegistry>,
    ctx: SourceContext,
    store: Arc<VaultStore>,
    /// Instances keep their derived key, so they are reused while the
    /// config is unchanged.
    method_cache: Mutex<HashMap<String, CachedMethod>>,
}

fn poisoned<T>(_: T) -> Error {
    Error::Storage("Method cache lock poisoned".to_string())
}

impl Vault {
    /// Create an empty vault with the built-in variants.
    pub fn new(ctx: SourceContext) -> Self {
        Self::with_registries(
            Arc::new(MethodRegistry::with_defaults()),
            Arc::new(SourceRegistry::with_defaults()),
            ctx,
        )
    }

    pub fn with_registries(
        methods: Arc<MethodRegistry>,
        sources: Arc<SourceRegistry>,
        ctx: SourceContext,
    ) -> Self {
        Self {
            config: ConfigService::new(methods.clone(), sources.clone(), ctx.clone()),
            methods,
            sources,
            ctx,
            store: Arc::new(VaultStore::new()),
            method_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Load configuration and entry state from the context's key-value store.
    pub fn open(ctx: SourceContext) -> Result<Self> {
        let vault = Self::new(ctx);
        vault.config.load(vault.ctx.kv.as_ref())?;
        vault.store.restore(vault.ctx.kv.as_ref())?;
        info!(
            sources = vault.config.snapshot().sources.len(),
            "Opened vault"
        );
        Ok(vault)
    }

    /// Persist configuration and entry state.
    pub fn save(&self) -> Result<()> {
        self.config.save(self.ctx.kv.as_ref())?;
        self.store.persist(self.ctx.kv.as_ref())
    }

    pub fn config(&self) -> &ConfigService {
        &self.config
    }

    pub fn store(&self) -> &Arc<VaultStore> {
        &self.store
    }

    pub fn context(&self) -> &SourceContext {
        &self.ctx
    }

    pub fn method_registry(&self) -> &MethodRegistry {
        &self.methods
    }

    pub fn source_registry(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Method instance for a configured method name.
    pub fn method(&self, name: &str) -> Result<Arc<dyn EncryptionMethod>> {
        let snapshot = self.config.snapshot();
        let config = snapshot
            .method(name)
            .ok_or_else(|| Error::NotFound(format!("Encryption method \"{}\" not found", name)))?;

        let mut cache = self.method_cache.lock().map_err(poisoned)?;
        if let Some((cached, method)) = cache.get(name) {
            if cached == config {
                return Ok(method.clone());
            }
        }
        let method = self.methods.create(config)?;
        cache.insert(name.to_string(), (config.clone(), method.clone()));
        Ok(method)
    }

    /// Method instance used for a source's payloads.
    pub fn method_for(&self, index: SourceIndex) -> Result<Arc<dyn EncryptionMethod>> {
        let snapshot = self.config.snapshot();
        let config = snapshot.method_for(index)?;
        self.method(config.name())
    }

    /// Source instance derived from the current configuration.
    pub fn source(&self, index: SourceIndex) -> Result<Arc<dyn Source>> {
        let snapshot = self.config.snapshot();
        let config = snapshot
            .source(index)
            .ok_or_else(|| Error::NotFound(format!("Source {} not configured", index)))?;
        self.sources.create(config, &self.ctx)
    }

    fn check_source(&self, index: SourceIndex) -> Result<()> {
        if self.config.snapshot().source(index).is_none() {
            return Err(Error::NotFound(format!("Source {} not configured", index)));
        }
        Ok(())
    }

    /// Remove a source's configuration and entries. Later sources move
    /// down one index.
    pub async fn remove_source(&self, index: SourceIndex) -> Result<SourceConfig> {
        let _guard = self.store.writer().await;
        self.check_source(index)?;
        let saved = self.store.snapshot_all()?;
        self.store.remove_source(index)?;
        match self.config.remove_source(index) {
            Ok(removed) => Ok(removed),
            Err(e) => {
                self.store.reset_to(saved)?;
                Err(e)
            }
        }
    }

    pub fn entries(&self, index: SourceIndex) -> Result<Arc<SourceEntries>> {
        self.store.snapshot(index)
    }

    /// Entries inside the folder called `folder`, or the root for `None`.
    pub fn children_of(&self, index: SourceIndex, folder: Option<&str>) -> Result<Vec<FileEntry>> {
        let entries = self.store.snapshot(index)?;
        Ok(entries
            .children_of_named(folder)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Encrypt `plaintext` with the source's method and add it as a new
    /// locked entry.
    pub async fn add_file(
        &self,
        index: SourceIndex,
        name: &str,
        kind: EntryKind,
        plaintext: &[u8],
        parent: Option<EntryId>,
    ) -> Result<EntryId> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        let ciphertext = method.encrypt(plaintext).await?;
        let id = self
            .store
            .mutate(index, |s| s.add_file(name, kind, ciphertext, parent))?;
        debug!(source = %index, entry = %id, bytes = plaintext.len(), "Added file");
        Ok(id)
    }

    pub fn add_folder(&self, index: SourceIndex, name: &str, parent: Option<EntryId>) -> Result<EntryId> {
        self.check_source(index)?;
        self.store.mutate(index, |s| s.add_folder(name, parent))
    }

    /// Add a prepared entry.
    pub fn add(&self, index: SourceIndex, entry: FileEntry) -> Result<EntryId> {
        self.check_source(index)?;
        self.store.mutate(index, |s| s.add(entry))
    }

    pub fn update(&self, index: SourceIndex, id: EntryId, entry: FileEntry) -> Result<()> {
        self.store.mutate(index, |s| s.update(id, entry))
    }

    pub fn rename(&self, index: SourceIndex, id: EntryId, name: &str) -> Result<()> {
        self.store.mutate(index, |s| s.rename(id, name))
    }

    pub fn delete(&self, index: SourceIndex, id: EntryId) -> Result<FileEntry> {
        self.store.mutate(index, |s| s.delete(id))
    }

    /// Move entries into the folder called `target` (root for `None`).
    pub fn move_entries(&self, index: SourceIndex, ids: &[EntryId], target: Option<&str>) -> Result<usize> {
        self.store.mutate(index, |s| s.move_to_folder(ids, target))
    }

    async fn decrypt_entry(
        &self,
        index: SourceIndex,
        id: EntryId,
        method: &dyn EncryptionMethod,
    ) -> Result<PlaintextCache> {
        let seen = {
            let entries = self.store.snapshot(index)?;
            let entry = entries
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
            if entry.is_folder() {
                return Err(Error::InvalidInput("Folders cannot be decrypted".to_string()));
            }
            entry.clone()
        };

        let data = method.decrypt(&seen.ciphertext).await?;
        let cache = PlaintextCache::for_kind(seen.kind, data);
        self.store
            .mutate(index, |s| s.commit_plaintext(id, &seen, cache.clone()))?;
        Ok(cache)
    }

    async fn encrypt_entry(&self, index: SourceIndex, id: EntryId, method: &dyn EncryptionMethod) -> Result<()> {
        let plaintext = {
            let entries = self.store.snapshot(index)?;
            let entry = entries
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
            entry.plaintext.clone().ok_or_else(|| {
                Error::InvalidInput(format!("Entry {} has no decrypted content", id))
            })?
        };

        let ciphertext = method.encrypt(plaintext.as_bytes()).await?;
        self.store
            .mutate(index, |s| s.commit_ciphertext(id, &plaintext, ciphertext))
    }

    /// Decrypt an entry and cache the result.
    pub async fn decrypt(&self, index: SourceIndex, id: EntryId) -> Result<PlaintextCache> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        self.decrypt_entry(index, id, method.as_ref()).await
    }

    /// Re-encrypt an entry's cached content, then drop the cache.
    pub async fn encrypt(&self, index: SourceIndex, id: EntryId) -> Result<()> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        self.encrypt_entry(index, id, method.as_ref()).await
    }

    /// Replace an entry's cached content; it is encrypted by [`Vault::encrypt`].
    pub fn edit(&self, index: SourceIndex, id: EntryId, content: PlaintextCache) -> Result<()> {
        self.store.mutate(index, |s| s.set_plaintext(id, content))
    }

    pub fn lock(&self, index: SourceIndex, id: EntryId) -> Result<()> {
        self.store.mutate(index, |s| s.lock(id))
    }

    /// Lock every entry of every source.
    pub fn lock_all(&self) -> Result<usize> {
        let mut locked = 0;
        for index in self.store.source_indices()? {
            locked += self.store.mutate(index, |s| Ok(s.lock_all()))?;
        }
        Ok(locked)
    }

    pub fn set_thumbnail(&self, index: SourceIndex, id: EntryId, thumbnail: Option<Vec<u8>>) -> Result<()> {
        self.store
            .mutate(index, |s| s.set_thumbnail(id, thumbnail.map(SensitiveBytes::new)))
    }

    pub fn set_tags(&self, index: SourceIndex, id: EntryId, tags: Vec<String>) -> Result<()> {
        self.store.mutate(index, |s| s.set_tags(id, tags))
    }

    pub fn set_notes(&self, index: SourceIndex, id: EntryId, notes: Option<String>) -> Result<()> {
        self.store.mutate(index, |s| s.set_notes(id, notes))
    }

    /// Move an entry's tags and notes into an encrypted blob.
    pub async fn seal_metadata(&self, index: SourceIndex, id: EntryId) -> Result<()> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        let meta = {
            let entries = self.store.snapshot(index)?;
            let entry = entries
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
            if entry.sealed_metadata.is_some() {
                return Err(Error::InvalidInput(format!("Metadata of {} is already sealed", id)));
            }
            SealedMetadata::new(entry.tags.clone(), entry.notes.clone())
        };
        let sealed = meta.seal(method.as_ref()).await?;
        self.store.mutate(index, |s| s.set_sealed_metadata(id, sealed))
    }

    /// Decrypt an entry's sealed metadata back into clear tags and notes.
    pub async fn unseal_metadata(&self, index: SourceIndex, id: EntryId) -> Result<SealedMetadata> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        let sealed = {
            let entries = self.store.snapshot(index)?;
            let entry = entries
                .get(id)
                .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
            entry
                .sealed_metadata
                .clone()
                .ok_or_else(|| Error::InvalidInput(format!("Metadata of {} is not sealed", id)))?
        };
        let meta = SealedMetadata::unseal(method.as_ref(), &sealed).await?;
        self.store
            .mutate(index, |s| s.restore_metadata(id, meta.tags.clone(), meta.notes.clone()))?;
        Ok(meta)
    }

    /// Decrypt many entries. Each failure is reported, none aborts the batch.
    pub async fn bulk_decrypt(&self, index: SourceIndex, ids: &[EntryId], options: &BulkOptions) -> Result<BulkReport> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        Ok(run_bulk(ids, options, |id| {
            let method = method.clone();
            async move { self.decrypt_entry(index, id, method.as_ref()).await.map(|_| ()) }
        })
        .await)
    }

    /// Re-encrypt many unlocked entries.
    pub async fn bulk_encrypt(&self, index: SourceIndex, ids: &[EntryId], options: &BulkOptions) -> Result<BulkReport> {
        let _guard = self.store.writer().await;
        let method = self.method_for(index)?;
        Ok(run_bulk(ids, options, |id| {
            let method = method.clone();
            async move { self.encrypt_entry(index, id, method.as_ref()).await }
        })
        .await)
    }

    /// Delete many entries.
    ///
    /// Non-folders go first and folders deepest-first, so a folder deleted
    /// together with its contents succeeds. Outcomes keep input order.
    pub async fn bulk_delete(&self, index: SourceIndex, ids: &[EntryId], options: &BulkOptions) -> Result<BulkReport> {
        let _guard = self.store.writer().await;
        let snapshot = self.store.snapshot(index)?;

        let depth = |id: EntryId| {
            let mut depth = 0usize;
            let mut current = snapshot.get(id).and_then(|e| e.parent);
            while let Some(parent) = current {
                depth += 1;
                if depth > snapshot.len() {
                    break;
                }
                current = snapshot.get(parent).and_then(|e| e.parent);
            }
            depth
        };
        let is_folder = |id: EntryId| snapshot.get(id).map(|e| e.is_folder()).unwrap_or(false);

        let mut ordered: Vec<EntryId> = ids.iter().copied().filter(|id| !is_folder(*id)).collect();
        let mut folders: Vec<EntryId> = ids.iter().copied().filter(|id| is_folder(*id)).collect();
        folders.sort_by_key(|id| std::cmp::Reverse(depth(*id)));
        ordered.extend(folders);

        let sequential = options.clone().with_concurrency(1);
        let report = run_bulk(&ordered, &sequential, |id| async move {
            self.store.mutate(index, |s| s.delete(id)).map(|_| ())
        })
        .await;

        let mut by_id: HashMap<EntryId, Vec<ItemOutcome>> = HashMap::new();
        for outcome in report.outcomes {
            by_id.entry(outcome.id).or_default().push(outcome);
        }
        let outcomes: Vec<ItemOutcome> = ids
            .iter()
            .filter_map(|id| by_id.get_mut(id).and_then(|v| (!v.is_empty()).then(|| v.remove(0))))
            .collect();
        Ok(BulkReport::from_outcomes(outcomes))
    }

    /// Write an entry's ciphertext into its source under `folder`.
    pub async fn push(&self, index: SourceIndex, id: EntryId, folder: &SourcePath) -> Result<SourcePath> {
        let entry = self
            .store
            .snapshot(index)?
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))?;
        if entry.is_folder() {
            return Err(Error::InvalidInput("Folders have no payload".to_string()));
        }

        let path = folder.join(&entry.name)?;
        let source = self.source(index)?;
        source.write(&path, entry.ciphertext.into_bytes()).await?;
        info!(source = %index, entry = %id, path = %path, "Stored payload in source");
        Ok(path)
    }

    /// Read a ciphertext payload from the source and add it as an entry.
    pub async fn pull(&self, index: SourceIndex, path: &SourcePath, parent: Option<EntryId>) -> Result<EntryId> {
        let name = path
            .name()
            .ok_or_else(|| Error::InvalidInput("Cannot pull the root folder".to_string()))?
            .to_string();
        let source = self.source(index)?;
        let bytes = source.read(path).await?;
        let ciphertext = String::from_utf8(bytes)
            .map_err(|_| Error::MalformedCiphertext(format!("{} is not framed ciphertext", path)))?;
        if !ciphertext.contains(':') {
            return Err(Error::MalformedCiphertext(format!("{} is not framed ciphertext", path)));
        }

        let _guard = self.store.writer().await;
        let kind = EntryKind::from_file_name(&name);
        self.store
            .mutate(index, |s| s.add_file(&name, kind, ciphertext, parent))
    }
}
