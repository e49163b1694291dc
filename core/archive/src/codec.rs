//! Archive export and import.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zeroize::Zeroizing;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use safebox_common::{Error, Result, SourceIndex};
use safebox_crypto::{CipherEngine, KdfParams, Salt};
use safebox_vault::{SourceEntries, VaultStore};

use crate::index::{self, IndexRecord};
use crate::layout::{self, INDEX_FILE, SALT_FILE};

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Import(format!("Unreadable archive: {}", e))
}

fn task_error(e: tokio::task::JoinError) -> Error {
    Error::Storage(format!("Archive task failed: {}", e))
}

fn check(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Encrypted payloads of one source, ready to be packed.
struct SourceSection {
    index: SourceIndex,
    payloads: Vec<(String, String)>,
    sealed_index: String,
}

/// Writes and reads vault archives under one passphrase.
///
/// Entry payloads are copied as-is; they are already ciphertext under the
/// source's own method. Only the per-source index is encrypted here.
pub struct ArchiveCodec {
    passphrase: Zeroizing<String>,
    params: KdfParams,
}

impl ArchiveCodec {
    /// # Errors
    /// - `InvalidInput` if the passphrase is empty
    pub fn new(passphrase: impl Into<String>) -> Result<Self> {
        let passphrase = Zeroizing::new(passphrase.into());
        if passphrase.is_empty() {
            return Err(Error::InvalidInput("Archive passphrase cannot be empty".to_string()));
        }
        Ok(Self {
            passphrase,
            params: KdfParams::standard(),
        })
    }

    /// Override the key derivation parameters.
    pub fn with_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    async fn engine(&self, salt: Salt, cancel: &CancellationToken) -> Result<CipherEngine> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            engine = CipherEngine::derive_with_params(&self.passphrase, salt, self.params) => engine,
        }
    }

    /// Pack every given source into one archive.
    ///
    /// Sources without entries still get an (empty) index.
    pub async fn export(
        &self,
        sources: &BTreeMap<SourceIndex, Arc<SourceEntries>>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        check(cancel)?;
        let salt = Salt::generate();
        let engine = self.engine(salt.clone(), cancel).await?;

        let mut sections = Vec::with_capacity(sources.len());
        for (index, entries) in sources {
            check(cancel)?;
            let records = index::build(entries);
            let payloads = records
                .iter()
                .zip(entries.iter())
                .filter(|(_, entry)| !entry.is_folder())
                .map(|(record, entry)| (record.generic_id.clone(), entry.ciphertext.clone()))
                .collect();
            let json = Zeroizing::new(serde_json::to_vec(&records)?);
            sections.push(SourceSection {
                index: *index,
                payloads,
                sealed_index: engine.encrypt(&json)?,
            });
            debug!(source = %index, entries = records.len(), "Sealed source index");
        }

        check(cancel)?;
        let salt_text = salt.to_base64();
        let bytes = tokio::task::spawn_blocking(move || write_container(&salt_text, &sections))
            .await
            .map_err(task_error)??;
        check(cancel)?;

        info!(sources = sources.len(), bytes = bytes.len(), "Exported vault archive");
        Ok(bytes)
    }

    /// Snapshot `indices` from the store and export them. Indices without
    /// state are exported as empty sources.
    pub async fn export_store(
        &self,
        store: &VaultStore,
        indices: impl IntoIterator<Item = SourceIndex>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let mut sources = BTreeMap::new();
        for index in indices {
            sources.insert(index, store.snapshot(index)?);
        }
        self.export(&sources, cancel).await
    }

    /// Unpack an archive into per-source entry lists.
    ///
    /// # Errors
    /// - `Import` if the container is unreadable, a section lacks its
    ///   index, an index does not decrypt or parse, or a payload is missing
    /// - `Cancelled` if `cancel` fires first
    pub async fn import(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<SourceIndex, SourceEntries>> {
        check(cancel)?;
        let data = bytes.to_vec();
        let files = tokio::task::spawn_blocking(move || read_container(data))
            .await
            .map_err(task_error)??;

        let salt = match files.get(SALT_FILE) {
            Some(encoded) => {
                let text = std::str::from_utf8(encoded)
                    .map_err(|_| Error::Import("Archive salt is not text".to_string()))?;
                Salt::from_base64(text.trim())
                    .map_err(|e| Error::Import(format!("Archive salt is invalid: {}", e)))?
            }
            None => Salt::legacy(),
        };

        let mut indices = BTreeSet::new();
        let mut payloads: HashMap<SourceIndex, HashMap<String, String>> = HashMap::new();
        let mut sealed: HashMap<SourceIndex, String> = HashMap::new();
        for (path, data) in &files {
            let Some((index, name)) = layout::split_path(path) else {
                continue;
            };
            indices.insert(index);
            if name.is_empty() {
                continue;
            }
            let text = String::from_utf8(data.clone())
                .map_err(|_| Error::Import(format!("{} is not ciphertext text", path)))?;
            if name == INDEX_FILE {
                sealed.insert(index, text);
            } else {
                payloads.entry(index).or_default().insert(name.to_string(), text);
            }
        }

        let engine = self.engine(salt, cancel).await?;
        let empty = HashMap::new();
        let mut restored = BTreeMap::new();
        for index in indices {
            check(cancel)?;
            let sealed_index = sealed.get(&index).ok_or_else(|| {
                Error::Import(format!("Source {} has no index", index))
            })?;
            let json = Zeroizing::new(engine.decrypt(sealed_index).map_err(|e| {
                Error::Import(format!(
                    "Index of source {} cannot be decrypted ({}); check the passphrase",
                    index, e
                ))
            })?);
            let records: Vec<IndexRecord> = serde_json::from_slice(&json)
                .map_err(|e| Error::Import(format!("Index of source {} is invalid: {}", index, e)))?;
            let entries = index::rebuild(records, payloads.get(&index).unwrap_or(&empty))?;
            debug!(source = %index, entries = entries.len(), "Restored source from archive");
            restored.insert(index, entries);
        }

        info!(sources = restored.len(), "Imported vault archive");
        Ok(restored)
    }

    /// Import an archive and merge it into `store`. Only the sources in the
    /// archive are overwritten. Nothing is merged if the import fails.
    pub async fn import_into(
        &self,
        store: &VaultStore,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceIndex>> {
        let restored = self.import(bytes, cancel).await?;
        let _guard = store.writer().await;
        check(cancel)?;
        let indices: Vec<SourceIndex> = restored.keys().copied().collect();
        store.merge(restored)?;
        Ok(indices)
    }
}

impl std::fmt::Debug for ArchiveCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCodec")
            .field("passphrase", &"[REDACTED]")
            .field("params", &self.params)
            .finish()
    }
}

fn write_container(salt: &str, sections: &[SourceSection]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    writer.start_file(SALT_FILE, options).map_err(zip_error)?;
    writer.write_all(salt.as_bytes())?;

    for section in sections {
        for (generic, ciphertext) in &section.payloads {
            writer
                .start_file(layout::payload_path(section.index, generic), options)
                .map_err(zip_error)?;
            writer.write_all(ciphertext.as_bytes())?;
        }
        writer
            .start_file(layout::index_path(section.index), options)
            .map_err(zip_error)?;
        writer.write_all(section.sealed_index.as_bytes())?;
    }

    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// Members larger than this grow their buffer while reading.
const MAX_PREALLOC: u64 = 1 << 20;

/// Buffer size to reserve for a member declaring `size` bytes. The
/// declared size comes from the archive header and is not trusted.
fn capacity_hint(size: u64) -> usize {
    size.min(MAX_PREALLOC) as usize
}

fn read_container(bytes: Vec<u8>) -> Result<HashMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;
    let mut files = HashMap::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(zip_error)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(capacity_hint(file.size()));
        file.read_to_end(&mut data)
            .map_err(|e| Error::Import(format!("Unreadable archive member: {}", e)))?;
        files.insert(file.name().to_string(), data);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use safebox_vault::EntryKind;

    fn codec(passphrase: &str) -> ArchiveCodec {
        ArchiveCodec::new(passphrase)
            .unwrap()
            .with_params(KdfParams::with_iterations(1_000))
    }

    fn vault() -> BTreeMap<SourceIndex, Arc<SourceEntries>> {
        let mut entries = SourceEntries::new();
        entries
            .add_file("note.txt", EntryKind::Text, "bm9uY2U=:Y2lwaGVy".into(), None)
            .unwrap();
        entries.add_folder("Docs", None).unwrap();
        BTreeMap::from([(SourceIndex(0), Arc::new(entries))])
    }

    fn names(bytes: &[u8]) -> Vec<String> {
        let archive = ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_declared_size_does_not_drive_allocation() {
        assert_eq!(capacity_hint(0), 0);
        assert_eq!(capacity_hint(512), 512);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOC as usize);
        assert_eq!(capacity_hint(isize::MAX as u64 + 1), MAX_PREALLOC as usize);
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(ArchiveCodec::new(""), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_layout_hides_names() {
        let bytes = codec("pw")
            .export(&vault(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            names(&bytes),
            vec!["source-0/file-0", "source-0/vault-index.json.enc", "vault.salt"]
        );
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("note.txt"));
        assert!(!text.contains("Docs"));
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_import_error() {
        let bytes = codec("pw")
            .export(&vault(), &CancellationToken::new())
            .await
            .unwrap();
        let result = codec("other").import(&bytes, &CancellationToken::new()).await;
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[tokio::test]
    async fn test_garbage_is_import_error() {
        let result = codec("pw")
            .import(b"not a zip file", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[tokio::test]
    async fn test_cancelled_export() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = codec("pw").export(&vault(), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_section_without_index_fails() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("source-3/file-0", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"a:b").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let result = codec("pw").import(&bytes, &CancellationToken::new()).await;
        match result {
            Err(Error::Import(msg)) => assert!(msg.contains("no index")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
