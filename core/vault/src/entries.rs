//! Ordered entry list of one source.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use safebox_common::{EntryId, Error, Result, SensitiveBytes};

use crate::entry::{EntryKind, FileEntry, PlaintextCache};

/// How a tag filter combines its tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatch {
    /// Entry carries every tag.
    #[default]
    All,
    /// Entry carries at least one tag.
    Any,
}

/// The entries of one source, in display order.
///
/// Ids come from a per-source counter and are never reused.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntries {
    entries: Vec<FileEntry>,
    next_id: u64,
}

impl SourceEntries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from existing entries, continuing the id counter after the
    /// highest id present.
    pub fn from_entries(entries: Vec<FileEntry>) -> Self {
        let next_id = entries.iter().map(|e| e.id.0 + 1).max().unwrap_or(0);
        Self { entries, next_id }
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: EntryId) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Position of an entry in display order.
    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn require(&self, id: EntryId) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| Error::NotFound(format!("Entry {} not found", id)))
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut FileEntry> {
        let pos = self.require(id)?;
        Ok(&mut self.entries[pos])
    }

    /// Reserve the next id.
    pub fn allocate_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Parent references must name a folder of this source.
    fn check_parent(&self, parent: Option<EntryId>) -> Result<()> {
        match parent {
            None => Ok(()),
            Some(id) => match self.get(id) {
                Some(entry) if entry.is_folder() => Ok(()),
                Some(_) => Err(Error::InvalidInput(format!("Entry {} is not a folder", id))),
                None => Err(Error::InvalidInput(format!("Parent folder {} not found", id))),
            },
        }
    }

    /// Folder names are unique within one parent scope.
    fn check_folder_name(&self, name: &str, parent: Option<EntryId>, except: Option<EntryId>) -> Result<()> {
        let clash = self.entries.iter().any(|e| {
            e.is_folder() && e.parent == parent && e.name == name && Some(e.id) != except
        });
        if clash {
            return Err(Error::AlreadyExists(format!("Folder \"{}\" already exists", name)));
        }
        Ok(())
    }

    fn check_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("Entry name cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Append an entry, allocating a fresh id when the given one is taken.
    pub fn add(&mut self, mut entry: FileEntry) -> Result<EntryId> {
        Self::check_name(&entry.name)?;
        self.check_parent(entry.parent)?;
        if entry.is_folder() {
            self.check_folder_name(&entry.name, entry.parent, None)?;
            entry.ciphertext.clear();
        }
        if self.get(entry.id).is_some() || entry.id.0 < self.next_id {
            entry.id = self.allocate_id();
        } else {
            self.next_id = entry.id.0 + 1;
        }
        let id = entry.id;
        self.entries.push(entry);
        Ok(id)
    }

    /// Add a file holding only ciphertext.
    pub fn add_file(
        &mut self,
        name: &str,
        kind: EntryKind,
        ciphertext: String,
        parent: Option<EntryId>,
    ) -> Result<EntryId> {
        if kind.is_folder() {
            return Err(Error::InvalidInput("Use add_folder for folders".to_string()));
        }
        let id = EntryId(self.next_id);
        self.add(FileEntry::file(id, name, kind, ciphertext, parent))
    }

    /// Add a folder, rejecting a duplicate name in the same scope.
    pub fn add_folder(&mut self, name: &str, parent: Option<EntryId>) -> Result<EntryId> {
        let id = EntryId(self.next_id);
        self.add(FileEntry::folder(id, name, parent))
    }

    /// Replace an entry, keeping its id.
    pub fn update(&mut self, id: EntryId, mut entry: FileEntry) -> Result<()> {
        let pos = self.require(id)?;
        Self::check_name(&entry.name)?;
        self.check_parent(entry.parent)?;
        if self.is_within(entry.parent, id) {
            return Err(Error::InvalidInput("A folder cannot contain itself".to_string()));
        }
        if entry.is_folder() {
            self.check_folder_name(&entry.name, entry.parent, Some(id))?;
            entry.ciphertext.clear();
            entry.plaintext = None;
            entry.thumbnail = None;
        }
        if self.entries[pos].is_folder() && !entry.is_folder() && self.has_children(id) {
            return Err(Error::NotPermitted(format!(
                "Folder {} still has children",
                id
            )));
        }
        entry.id = id;
        self.entries[pos] = entry;
        Ok(())
    }

    /// Rename an entry. Children keep pointing at a renamed folder.
    pub fn rename(&mut self, id: EntryId, name: &str) -> Result<()> {
        Self::check_name(name)?;
        let pos = self.require(id)?;
        let entry = &self.entries[pos];
        if entry.is_folder() {
            self.check_folder_name(name, entry.parent, Some(id))?;
        }
        self.entries[pos].name = name.to_string();
        Ok(())
    }

    /// Whether `folder` is `ancestor` or lies somewhere beneath it.
    fn is_within(&self, folder: Option<EntryId>, ancestor: EntryId) -> bool {
        let mut current = folder;
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.entries.len() {
                return true;
            }
            current = self.get(id).and_then(|e| e.parent);
        }
        false
    }

    pub fn has_children(&self, id: EntryId) -> bool {
        self.entries.iter().any(|e| e.parent == Some(id))
    }

    /// Remove an entry. A folder that still has children is kept.
    pub fn delete(&mut self, id: EntryId) -> Result<FileEntry> {
        let pos = self.require(id)?;
        if self.entries[pos].is_folder() && self.has_children(id) {
            return Err(Error::NotPermitted(format!(
                "Folder \"{}\" is not empty",
                self.entries[pos].name
            )));
        }
        Ok(self.entries.remove(pos))
    }

    /// Point each addressed non-folder entry at `target`.
    ///
    /// Folders in `ids` are skipped. Returns how many entries moved.
    pub fn move_entries(&mut self, ids: &[EntryId], target: Option<EntryId>) -> Result<usize> {
        self.check_parent(target)?;
        for id in ids {
            self.require(*id)?;
        }

        let mut moved = 0;
        for entry in self.entries.iter_mut() {
            if ids.contains(&entry.id) && !entry.is_folder() {
                entry.parent = target;
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Entries directly inside `parent` (`None` for the root).
    pub fn children_of(&self, parent: Option<EntryId>) -> Vec<&FileEntry> {
        self.entries.iter().filter(|e| e.parent == parent).collect()
    }

    /// First folder called `name`, in display order.
    pub fn find_folder(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.is_folder() && e.name == name)
    }

    /// Resolve a folder name to its id; `None` stands for the root.
    pub fn resolve_folder(&self, name: Option<&str>) -> Result<Option<EntryId>> {
        match name {
            None => Ok(None),
            Some(name) => self
                .find_folder(name)
                .map(|f| Some(f.id))
                .ok_or_else(|| Error::NotFound(format!("Folder \"{}\" not found", name))),
        }
    }

    /// Entries inside the folder called `name`, or at the root for `None`.
    pub fn children_of_named(&self, name: Option<&str>) -> Result<Vec<&FileEntry>> {
        Ok(self.children_of(self.resolve_folder(name)?))
    }

    /// Move entries into the folder called `target` (root for `None`).
    pub fn move_to_folder(&mut self, ids: &[EntryId], target: Option<&str>) -> Result<usize> {
        let target = self.resolve_folder(target)?;
        self.move_entries(ids, target)
    }

    /// Case-insensitive name search.
    pub fn search(&self, term: &str) -> Vec<&FileEntry> {
        let needle = term.to_lowercase();
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Entries carrying the given tags. An empty tag list matches everything.
    pub fn filter_by_tags(&self, tags: &[String], mode: TagMatch) -> Vec<&FileEntry> {
        if tags.is_empty() {
            return self.entries.iter().collect();
        }
        self.entries
            .iter()
            .filter(|e| match mode {
                TagMatch::All => tags.iter().all(|t| e.tags.contains(t)),
                TagMatch::Any => tags.iter().any(|t| e.tags.contains(t)),
            })
            .collect()
    }

    /// Every tag in use, sorted and deduplicated.
    pub fn all_tags(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|e| e.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn set_tags(&mut self, id: EntryId, tags: Vec<String>) -> Result<()> {
        let mut seen = HashSet::new();
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .collect();
        self.entry_mut(id)?.tags = tags;
        Ok(())
    }

    pub fn set_notes(&mut self, id: EntryId, notes: Option<String>) -> Result<()> {
        self.entry_mut(id)?.notes = notes.filter(|n| !n.is_empty());
        Ok(())
    }

    /// Replace clear tags and notes with a sealed blob.
    pub fn set_sealed_metadata(&mut self, id: EntryId, sealed: String) -> Result<()> {
        let entry = self.entry_mut(id)?;
        entry.tags.clear();
        entry.notes = None;
        entry.sealed_metadata = Some(sealed);
        Ok(())
    }

    /// Restore clear tags and notes, dropping the sealed blob.
    pub fn restore_metadata(&mut self, id: EntryId, tags: Vec<String>, notes: Option<String>) -> Result<()> {
        let entry = self.entry_mut(id)?;
        entry.tags = tags;
        entry.notes = notes;
        entry.sealed_metadata = None;
        Ok(())
    }

    /// Cache decoded content.
    pub fn set_plaintext(&mut self, id: EntryId, cache: PlaintextCache) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.is_folder() {
            return Err(Error::InvalidInput("Folders have no content".to_string()));
        }
        entry.plaintext = Some(cache);
        Ok(())
    }

    /// Cache decrypted content unless the entry changed since `seen` was read.
    pub fn commit_plaintext(
        &mut self,
        id: EntryId,
        seen: &FileEntry,
        cache: PlaintextCache,
    ) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.ciphertext != seen.ciphertext || entry.plaintext != seen.plaintext {
            return Err(Error::Conflict(format!("Entry {} changed while decrypting", id)));
        }
        entry.plaintext = Some(cache);
        Ok(())
    }

    /// Store ciphertext for `encrypted`, unless the cache was edited or
    /// dropped while encrypting.
    pub fn commit_ciphertext(
        &mut self,
        id: EntryId,
        encrypted: &PlaintextCache,
        ciphertext: String,
    ) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.plaintext.as_ref() != Some(encrypted) {
            return Err(Error::Conflict(format!("Entry {} changed while encrypting", id)));
        }
        entry.ciphertext = ciphertext;
        entry.lock();
        Ok(())
    }

    pub fn set_thumbnail(&mut self, id: EntryId, thumbnail: Option<SensitiveBytes>) -> Result<()> {
        self.entry_mut(id)?.thumbnail = thumbnail;
        Ok(())
    }

    pub fn lock(&mut self, id: EntryId) -> Result<()> {
        self.entry_mut(id)?.lock();
        Ok(())
    }

    /// Lock every entry, returning how many were unlocked.
    pub fn lock_all(&mut self) -> usize {
        let mut locked = 0;
        for entry in self.entries.iter_mut() {
            if entry.is_unlocked() || entry.thumbnail.is_some() {
                locked += 1;
            }
            entry.lock();
        }
        locked
    }

    /// Copy without transient caches.
    pub fn durable(&self) -> Self {
        Self {
            entries: self.entries.iter().map(FileEntry::durable).collect(),
            next_id: self.next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zeroize::Zeroizing;

    fn sample() -> (SourceEntries, EntryId, EntryId) {
        let mut entries = SourceEntries::new();
        let docs = entries.add_folder("Docs", None).unwrap();
        let note = entries
            .add_file("note.txt", EntryKind::Text, "n:c".into(), None)
            .unwrap();
        (entries, docs, note)
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let (mut entries, docs, note) = sample();
        assert_ne!(docs, note);
        entries.delete(note).unwrap();
        let next = entries
            .add_file("b.txt", EntryKind::Text, "n:c".into(), None)
            .unwrap();
        assert!(next > note);
    }

    #[test]
    fn test_duplicate_folder_in_scope_rejected() {
        let (mut entries, docs, _) = sample();
        let before = entries.len();
        assert!(matches!(
            entries.add_folder("Docs", None),
            Err(Error::AlreadyExists(_))
        ));
        assert_eq!(entries.len(), before);

        // Same name in another scope is fine.
        entries.add_folder("Docs", Some(docs)).unwrap();
    }

    #[test]
    fn test_add_with_taken_id_gets_fresh_id() {
        let (mut entries, docs, _) = sample();
        let id = entries
            .add(FileEntry::file(docs, "x", EntryKind::Text, "n:c", None))
            .unwrap();
        assert_ne!(id, docs);
    }

    #[test]
    fn test_parent_must_be_folder() {
        let (mut entries, _, note) = sample();
        let result = entries.add_file("x", EntryKind::Text, "n:c".into(), Some(note));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        let result = entries.add_file("x", EntryKind::Text, "n:c".into(), Some(EntryId(99)));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_move_skips_folders() {
        let (mut entries, docs, note) = sample();
        let other = entries.add_folder("Other", None).unwrap();

        let moved = entries.move_entries(&[note, other], Some(docs)).unwrap();
        assert_eq!(moved, 1);
        assert_eq!(entries.get(note).unwrap().parent, Some(docs));
        assert_eq!(entries.get(other).unwrap().parent, None);
    }

    #[test]
    fn test_move_to_folder_by_name() {
        let (mut entries, docs, note) = sample();
        entries.move_to_folder(&[note], Some("Docs")).unwrap();

        let inside: Vec<_> = entries
            .children_of_named(Some("Docs"))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(inside, vec![note]);
        assert_eq!(entries.children_of(None).len(), 1);
        assert_eq!(entries.children_of(None)[0].id, docs);

        assert!(entries.move_to_folder(&[note], Some("Nope")).is_err());
    }

    #[test]
    fn test_rename_folder_keeps_children() {
        let (mut entries, docs, note) = sample();
        entries.move_entries(&[note], Some(docs)).unwrap();
        entries.rename(docs, "Papers").unwrap();

        assert_eq!(entries.children_of_named(Some("Papers")).unwrap().len(), 1);
        assert!(entries.children_of_named(Some("Docs")).is_err());
    }

    #[test]
    fn test_rename_folder_to_sibling_name_rejected() {
        let (mut entries, docs, _) = sample();
        entries.add_folder("Other", None).unwrap();
        assert!(entries.rename(docs, "Other").is_err());
        // Files may share names.
        entries
            .add_file("Other", EntryKind::Text, "n:c".into(), None)
            .unwrap();
    }

    #[test]
    fn test_delete_non_empty_folder_rejected() {
        let (mut entries, docs, note) = sample();
        entries.move_entries(&[note], Some(docs)).unwrap();

        assert!(matches!(entries.delete(docs), Err(Error::NotPermitted(_))));
        entries.delete(note).unwrap();
        entries.delete(docs).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_update_replaces_entry() {
        let (mut entries, _, note) = sample();
        let mut changed = entries.get(note).unwrap().clone();
        changed.name = "renamed.txt".into();
        entries.update(note, changed).unwrap();
        assert_eq!(entries.get(note).unwrap().name, "renamed.txt");
        assert!(entries.update(EntryId(42), FileEntry::folder(EntryId(42), "x", None)).is_err());
    }

    #[test]
    fn test_update_rejects_nested_cycle() {
        let mut entries = SourceEntries::new();
        let a = entries.add_folder("A", None).unwrap();
        let b = entries.add_folder("B", Some(a)).unwrap();
        let c = entries.add_folder("C", Some(b)).unwrap();

        for parent in [a, b, c] {
            let mut changed = entries.get(a).unwrap().clone();
            changed.parent = Some(parent);
            assert!(matches!(entries.update(a, changed), Err(Error::InvalidInput(_))));
        }
        assert_eq!(entries.get(a).unwrap().parent, None);
        assert_eq!(entries.children_of(None).len(), 1);

        // Moving a folder sideways is still allowed.
        let d = entries.add_folder("D", None).unwrap();
        let mut changed = entries.get(c).unwrap().clone();
        changed.parent = Some(d);
        entries.update(c, changed).unwrap();
        assert_eq!(entries.children_of(Some(d))[0].id, c);
    }

    #[test]
    fn test_update_file_to_folder_drops_content() {
        let (mut entries, _, note) = sample();
        entries
            .set_plaintext(note, PlaintextCache::Text(Zeroizing::new("hi".into())))
            .unwrap();
        let mut changed = entries.get(note).unwrap().clone();
        changed.kind = EntryKind::Folder;
        changed.name = "Notes".into();
        entries.update(note, changed).unwrap();

        let folder = entries.get(note).unwrap();
        assert!(folder.is_folder());
        assert!(folder.ciphertext.is_empty());
        assert!(folder.plaintext.is_none());
    }

    #[test]
    fn test_commit_ciphertext_rejects_stale_cache() {
        let (mut entries, _, note) = sample();
        let first = PlaintextCache::Text(Zeroizing::new("first".into()));
        entries.set_plaintext(note, first.clone()).unwrap();

        entries
            .set_plaintext(note, PlaintextCache::Text(Zeroizing::new("second".into())))
            .unwrap();
        let result = entries.commit_ciphertext(note, &first, "x:y".into());
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(entries.get(note).unwrap().ciphertext, "n:c");
        assert!(entries.get(note).unwrap().is_unlocked());

        entries.lock(note).unwrap();
        let result = entries.commit_ciphertext(note, &first, "x:y".into());
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn test_commit_plaintext_rejects_edited_entry() {
        let (mut entries, _, note) = sample();
        let seen = entries.get(note).unwrap().clone();
        entries
            .set_plaintext(note, PlaintextCache::Text(Zeroizing::new("edited".into())))
            .unwrap();

        let stale = PlaintextCache::Text(Zeroizing::new("old".into()));
        let result = entries.commit_plaintext(note, &seen, stale);
        assert!(matches!(result, Err(Error::Conflict(_))));
        assert_eq!(
            entries.get(note).unwrap().plaintext.as_ref().unwrap().as_bytes(),
            b"edited"
        );
    }

    #[test]
    fn test_set_tags_drops_repeats_in_order() {
        let (mut entries, _, note) = sample();
        entries
            .set_tags(note, vec!["x".into(), "y".into(), " x ".into(), "y".into(), "z".into()])
            .unwrap();
        assert_eq!(entries.get(note).unwrap().tags, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_tags_and_search() {
        let (mut entries, _, note) = sample();
        let photo = entries
            .add_file("Beach.PNG", EntryKind::Image, "n:c".into(), None)
            .unwrap();
        entries
            .set_tags(note, vec!["work".into(), " ".into(), "urgent".into()])
            .unwrap();
        entries.set_tags(photo, vec!["work".into()]).unwrap();

        assert_eq!(entries.all_tags(), vec!["urgent", "work"]);
        let both = ["work".to_string(), "urgent".to_string()];
        assert_eq!(entries.filter_by_tags(&both, TagMatch::All).len(), 1);
        assert_eq!(entries.filter_by_tags(&both, TagMatch::Any).len(), 2);
        assert_eq!(entries.search("beach")[0].id, photo);
    }

    #[test]
    fn test_lock_all_counts_unlocked() {
        let (mut entries, _, note) = sample();
        entries
            .set_plaintext(note, PlaintextCache::Text(Zeroizing::new("hi".into())))
            .unwrap();
        assert_eq!(entries.lock_all(), 1);
        assert!(!entries.get(note).unwrap().is_unlocked());
        assert_eq!(entries.get(note).unwrap().ciphertext, "n:c");
    }

    #[test]
    fn test_from_entries_continues_counter() {
        let entries = SourceEntries::from_entries(vec![
            FileEntry::folder(EntryId(4), "a", None),
            FileEntry::folder(EntryId(9), "b", None),
        ]);
        let mut entries = entries;
        assert_eq!(entries.allocate_id(), EntryId(10));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[derive(Debug, Clone)]
        enum Op {
            File(u8),
            Folder(u8),
            Delete(u8),
            Move(u8, u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                any::<u8>().prop_map(Op::File),
                any::<u8>().prop_map(Op::Folder),
                any::<u8>().prop_map(Op::Delete),
                (any::<u8>(), any::<u8>()).prop_map(|(a, b)| Op::Move(a, b)),
            ]
        }

        fn pick(entries: &SourceEntries, n: u8) -> Option<EntryId> {
            if entries.is_empty() {
                return None;
            }
            Some(entries.entries()[n as usize % entries.len()].id)
        }

        fn folder(entries: &SourceEntries, n: u8) -> Option<EntryId> {
            pick(entries, n).filter(|id| entries.get(*id).map(|e| e.is_folder()).unwrap_or(false))
        }

        proptest! {
            #[test]
            fn prop_ids_unique_and_parents_valid(ops in proptest::collection::vec(op(), 0..64)) {
                let mut entries = SourceEntries::new();
                for (i, op) in ops.into_iter().enumerate() {
                    let _ = match op {
                        Op::File(n) => entries
                            .add_file(&format!("f{}", i), EntryKind::Text, "a:b".into(), folder(&entries, n))
                            .map(|_| ()),
                        Op::Folder(n) => entries
                            .add_folder(&format!("d{}", n % 4), folder(&entries, n))
                            .map(|_| ()),
                        Op::Delete(n) => match pick(&entries, n) {
                            Some(id) => entries.delete(id).map(|_| ()),
                            None => Ok(()),
                        },
                        Op::Move(a, b) => match pick(&entries, a) {
                            Some(id) => entries.move_entries(&[id], folder(&entries, b)).map(|_| ()),
                            None => Ok(()),
                        },
                    };
                }

                let mut seen = HashSet::new();
                for entry in entries.iter() {
                    prop_assert!(seen.insert(entry.id));
                    if let Some(parent) = entry.parent {
                        prop_assert!(entries.get(parent).map(|p| p.is_folder()).unwrap_or(false));
                    }
                }
            }
        }
    }
}
