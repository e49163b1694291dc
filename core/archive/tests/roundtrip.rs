use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use safebox_archive::ArchiveCodec;
use safebox_common::{EntryId, Error, Result, SourceIndex};
use safebox_crypto::{EncryptionMethod, KdfParams, MethodConfig, Salt, SymmetricMethod};
use safebox_storage::{HttpResponse, HttpTransport, MemoryKv, SourceConfig, SourceContext};
use safebox_vault::{EntryKind, SourceEntries, Vault, VaultStore};

fn codec(passphrase: &str) -> ArchiveCodec {
    ArchiveCodec::new(passphrase)
        .unwrap()
        .with_params(KdfParams::with_iterations(1_000))
}

fn method() -> SymmetricMethod {
    SymmetricMethod::with_params("main", "pw", Salt::legacy(), KdfParams::with_iterations(1_000))
}

fn durable(entries: &SourceEntries) -> Vec<(EntryId, String, EntryKind, Option<EntryId>, String)> {
    entries
        .iter()
        .map(|e| (e.id, e.name.clone(), e.kind, e.parent, e.ciphertext.clone()))
        .collect()
}

#[tokio::test]
async fn note_and_folder_example() {
    let m = method();
    let mut entries = SourceEntries::new();
    let ciphertext = m.encrypt(b"hello").await.unwrap();
    entries
        .add_file("note.txt", EntryKind::Text, ciphertext, None)
        .unwrap();
    entries.add_folder("Docs", None).unwrap();
    let before = durable(&entries);
    let sources = BTreeMap::from([(SourceIndex(0), Arc::new(entries))]);

    let cancel = CancellationToken::new();
    let bytes = codec("vault-password").export(&sources, &cancel).await.unwrap();

    let names = {
        let reader = zip::ZipArchive::new(std::io::Cursor::new(bytes.clone())).unwrap();
        reader.file_names().map(String::from).collect::<Vec<_>>()
    };
    assert!(names.contains(&"source-0/vault-index.json.enc".to_string()));
    let payloads = names
        .iter()
        .filter(|n| n.starts_with("source-0/file-"))
        .count();
    assert_eq!(payloads, 1);

    let restored = codec("vault-password").import(&bytes, &cancel).await.unwrap();
    let source = &restored[&SourceIndex(0)];
    assert_eq!(source.len(), 2);
    assert_eq!(durable(source), before);

    let note = &source.entries()[0];
    assert_eq!(m.decrypt(&note.ciphertext).await.unwrap(), b"hello");
}

#[tokio::test]
async fn multi_source_merge_leaves_others_untouched() {
    let m = method();
    let store = VaultStore::new();

    let mut first = SourceEntries::new();
    let docs = first.add_folder("Docs", None).unwrap();
    first
        .add_file("a.txt", EntryKind::Text, m.encrypt(b"a").await.unwrap(), Some(docs))
        .unwrap();
    let tagged = first
        .add_file("b.png", EntryKind::Image, m.encrypt(b"b").await.unwrap(), None)
        .unwrap();
    first.set_tags(tagged, vec!["holiday".into()]).unwrap();
    store.replace(SourceIndex(0), first).unwrap();
    store.replace(SourceIndex(1), SourceEntries::new()).unwrap();

    let cancel = CancellationToken::new();
    let bytes = codec("pw")
        .export_store(&store, [SourceIndex(0), SourceIndex(1)], &cancel)
        .await
        .unwrap();
    let exported = store.snapshot(SourceIndex(0)).unwrap();

    let target = VaultStore::new();
    let mut untouched = SourceEntries::new();
    untouched.add_folder("Keep", None).unwrap();
    target.replace(SourceIndex(2), untouched.clone()).unwrap();
    let mut overwritten = SourceEntries::new();
    overwritten.add_folder("Old", None).unwrap();
    target.replace(SourceIndex(0), overwritten).unwrap();

    let merged = codec("pw").import_into(&target, &bytes, &cancel).await.unwrap();
    assert_eq!(merged, vec![SourceIndex(0), SourceIndex(1)]);

    assert_eq!(*target.snapshot(SourceIndex(0)).unwrap(), *exported);
    assert!(target.snapshot(SourceIndex(1)).unwrap().is_empty());
    assert_eq!(*target.snapshot(SourceIndex(2)).unwrap(), untouched);
    assert_eq!(
        target
            .snapshot(SourceIndex(0))
            .unwrap()
            .get(tagged)
            .unwrap()
            .tags,
        vec!["holiday"]
    );
}

#[tokio::test]
async fn failed_import_merges_nothing() {
    let store = VaultStore::new();
    let mut entries = SourceEntries::new();
    entries.add_folder("Docs", None).unwrap();
    store.replace(SourceIndex(0), entries).unwrap();

    let cancel = CancellationToken::new();
    let bytes = codec("pw")
        .export_store(&store, [SourceIndex(0)], &cancel)
        .await
        .unwrap();

    let target = VaultStore::new();
    let result = codec("wrong").import_into(&target, &bytes, &cancel).await;
    assert!(matches!(result, Err(Error::Import(_))));
    assert!(target.source_indices().unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_import_yields_nothing() {
    let cancel = CancellationToken::new();
    let bytes = codec("pw")
        .export(&BTreeMap::new(), &cancel)
        .await
        .unwrap();

    cancel.cancel();
    let result = codec("pw").import(&bytes, &cancel).await;
    assert!(matches!(result, Err(Error::Cancelled)));
}

struct Offline;

#[async_trait]
impl HttpTransport for Offline {
    async fn post_json(&self, url: &str, _: &serde_json::Value) -> Result<HttpResponse> {
        Err(Error::Connectivity(format!("{} unreachable", url)))
    }
}

#[tokio::test]
async fn vault_content_survives_archive() {
    let ctx = SourceContext::new(Arc::new(MemoryKv::new()), Arc::new(Offline));
    let vault = Vault::new(ctx.clone());
    vault
        .config()
        .add_method(MethodConfig::Symmetric {
            name: "main".into(),
            passphrase: "pw".into(),
            salt: Some(Salt::generate().to_base64()),
        })
        .unwrap();
    let idx = vault
        .config()
        .add_source(SourceConfig::Local {
            name: "browser".into(),
            encryption: "main".into(),
        })
        .await
        .unwrap();
    let id = vault
        .add_file(idx, "diary.txt", EntryKind::Text, b"dear diary", None)
        .await
        .unwrap();
    vault.decrypt(idx, id).await.unwrap();

    let cancel = CancellationToken::new();
    let bytes = codec("archive-pass")
        .export_store(vault.store(), [idx], &cancel)
        .await
        .unwrap();

    vault.delete(idx, id).unwrap();
    codec("archive-pass")
        .import_into(vault.store(), &bytes, &cancel)
        .await
        .unwrap();

    let entries = vault.entries(idx).unwrap();
    let restored = entries.get(id).unwrap();
    assert!(!restored.is_unlocked());
    assert_eq!(vault.decrypt(idx, id).await.unwrap().as_bytes(), b"dear diary");
}

#[derive(Debug, Clone)]
struct Spec {
    folder: bool,
    parent: Option<u8>,
    kind: EntryKind,
    ciphertext: String,
    tags: Vec<String>,
    notes: Option<String>,
    sealed: Option<String>,
}

fn spec() -> impl Strategy<Value = Spec> {
    (
        any::<bool>(),
        proptest::option::of(any::<u8>()),
        prop_oneof![
            Just(EntryKind::Text),
            Just(EntryKind::Image),
            Just(EntryKind::Video),
        ],
        "[A-Za-z0-9+/]{4,16}=?:[A-Za-z0-9+/]{4,24}",
        proptest::collection::vec("[a-z0-9]{1,6}", 0..4),
        proptest::option::of("[ -~]{1,20}"),
        proptest::option::of("[A-Za-z0-9+/]{8}:[A-Za-z0-9+/]{8}"),
    )
        .prop_map(|(folder, parent, kind, ciphertext, tags, notes, sealed)| Spec {
            folder,
            parent,
            kind,
            ciphertext,
            tags,
            notes,
            sealed,
        })
}

/// Build a source by replaying `specs`, skipping any the list rejects.
fn populate(specs: &[Spec], deletions: &[u8]) -> SourceEntries {
    let mut entries = SourceEntries::new();
    for (i, spec) in specs.iter().enumerate() {
        let folders: Vec<EntryId> = entries.iter().filter(|e| e.is_folder()).map(|e| e.id).collect();
        let parent = spec
            .parent
            .filter(|_| !folders.is_empty())
            .map(|n| folders[n as usize % folders.len()]);
        let added = if spec.folder {
            entries.add_folder(&format!("folder-{}", i), parent)
        } else {
            entries.add_file(&format!("file-{}", i), spec.kind, spec.ciphertext.clone(), parent)
        };
        let Ok(id) = added else { continue };
        entries.set_tags(id, spec.tags.clone()).unwrap();
        entries.set_notes(id, spec.notes.clone()).unwrap();
        if let Some(sealed) = &spec.sealed {
            entries.set_sealed_metadata(id, sealed.clone()).unwrap();
        }
    }
    for n in deletions {
        if entries.is_empty() {
            break;
        }
        let id = entries.entries()[*n as usize % entries.len()].id;
        let _ = entries.delete(id);
    }
    entries
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_export_then_import_restores_every_source(
        sources in proptest::collection::vec(
            (proptest::collection::vec(spec(), 0..12), proptest::collection::vec(any::<u8>(), 0..3)),
            1..4,
        ),
    ) {
        let vault: BTreeMap<SourceIndex, Arc<SourceEntries>> = sources
            .iter()
            .enumerate()
            .map(|(i, (specs, deletions))| (SourceIndex(i), Arc::new(populate(specs, deletions))))
            .collect();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let cancel = CancellationToken::new();
        let restored = runtime.block_on(async {
            let bytes = codec("archive-pass").export(&vault, &cancel).await.unwrap();
            codec("archive-pass").import(&bytes, &cancel).await.unwrap()
        });

        prop_assert_eq!(restored.len(), vault.len());
        for (index, original) in &vault {
            let expected = original.durable();
            prop_assert_eq!(restored[index].entries(), expected.entries());
        }
    }
}
