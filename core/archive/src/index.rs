//! Per-source archive index.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use safebox_common::{EntryId, Error, Result};
use safebox_vault::{EntryKind, FileEntry, SourceEntries};

use crate::layout::generic_name;

/// Reference from a record to its parent folder.
///
/// Archives written by the web client link folders by name; current
/// archives use entry ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParentRef {
    Id(EntryId),
    Name(String),
}

/// One entry as described by the encrypted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    /// Payload name inside the source section.
    #[serde(alias = "generic")]
    pub generic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub name: String,
    #[serde(alias = "type")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed_metadata: Option<String>,
}

impl IndexRecord {
    fn describe(position: usize, entry: &FileEntry) -> Self {
        Self {
            generic_id: generic_name(position),
            id: Some(entry.id),
            name: entry.name.clone(),
            kind: entry.kind,
            parent: entry.parent.map(ParentRef::Id),
            tags: entry.tags.clone(),
            notes: entry.notes.clone(),
            sealed_metadata: entry.sealed_metadata.clone(),
        }
    }
}

/// Describe every entry in display order. Generic ids follow position.
pub fn build(entries: &SourceEntries) -> Vec<IndexRecord> {
    entries
        .iter()
        .enumerate()
        .map(|(pos, entry)| IndexRecord::describe(pos, entry))
        .collect()
}

/// Rebuild a source's entries from its index and payloads.
///
/// # Errors
/// - `Import` on duplicate ids, a parent id that is not a folder of the
///   index, or a non-folder record without its payload
pub fn rebuild(records: Vec<IndexRecord>, payloads: &HashMap<String, String>) -> Result<SourceEntries> {
    let positional = records.iter().any(|r| r.id.is_none());
    let ids: Vec<EntryId> = records
        .iter()
        .enumerate()
        .map(|(pos, r)| match r.id {
            Some(id) if !positional => id,
            _ => EntryId(pos as u64),
        })
        .collect();

    let mut seen = HashSet::new();
    for id in &ids {
        if !seen.insert(*id) {
            return Err(Error::Import(format!("Duplicate entry id {} in index", id)));
        }
    }

    let folder_ids: HashSet<EntryId> = records
        .iter()
        .zip(&ids)
        .filter(|(r, _)| r.kind.is_folder())
        .map(|(_, id)| *id)
        .collect();
    let mut folders_by_name: HashMap<&str, EntryId> = HashMap::new();
    for (record, id) in records.iter().zip(&ids) {
        if record.kind.is_folder() {
            folders_by_name.entry(record.name.as_str()).or_insert(*id);
        }
    }

    let mut entries = Vec::with_capacity(records.len());
    for (record, id) in records.iter().zip(&ids) {
        let parent = match &record.parent {
            None => None,
            Some(ParentRef::Id(parent)) => {
                if !folder_ids.contains(parent) {
                    return Err(Error::Import(format!(
                        "Entry \"{}\" refers to missing folder {}",
                        record.name, parent
                    )));
                }
                Some(*parent)
            }
            Some(ParentRef::Name(name)) => match folders_by_name.get(name.as_str()) {
                Some(parent) => Some(*parent),
                None => {
                    warn!(entry = %record.name, folder = %name, "Parent folder missing, placing entry at root");
                    None
                }
            },
        };
        if parent == Some(*id) {
            return Err(Error::Import(format!("Folder \"{}\" contains itself", record.name)));
        }

        let mut entry = if record.kind.is_folder() {
            FileEntry::folder(*id, record.name.clone(), parent)
        } else {
            let ciphertext = payloads.get(&record.generic_id).ok_or_else(|| {
                Error::Import(format!(
                    "Payload {} of \"{}\" is missing",
                    record.generic_id, record.name
                ))
            })?;
            FileEntry::file(*id, record.name.clone(), record.kind, ciphertext.clone(), parent)
        };
        entry.tags = record.tags.clone();
        entry.notes = record.notes.clone();
        entry.sealed_metadata = record.sealed_metadata.clone();
        entries.push(entry);
    }

    Ok(SourceEntries::from_entries(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SourceEntries {
        let mut entries = SourceEntries::new();
        let docs = entries.add_folder("Docs", None).unwrap();
        entries
            .add_file("note.txt", EntryKind::Text, "n:c".into(), Some(docs))
            .unwrap();
        entries
            .add_file("cat.png", EntryKind::Image, "i:c".into(), None)
            .unwrap();
        entries
    }

    fn payloads(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_uses_positions() {
        let records = build(&sample());
        let generic: Vec<_> = records.iter().map(|r| r.generic_id.as_str()).collect();
        assert_eq!(generic, vec!["file-0", "file-1", "file-2"]);
        assert_eq!(records[1].parent, Some(ParentRef::Id(records[0].id.unwrap())));
    }

    #[test]
    fn test_record_json_shape() {
        let records = build(&sample());
        let json = serde_json::to_value(&records[1]).unwrap();
        assert_eq!(json["genericId"], "file-1");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["parent"], 0);
        assert!(json.get("tags").is_none());
    }

    #[test]
    fn test_rebuild_restores_structure() {
        let original = sample();
        let records = build(&original);
        let rebuilt = rebuild(records, &payloads(&[("file-1", "n:c"), ("file-2", "i:c")])).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_missing_payload_fails() {
        let records = build(&sample());
        let result = rebuild(records, &payloads(&[("file-1", "n:c")]));
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_dangling_parent_fails() {
        let mut records = build(&sample());
        records[2].parent = Some(ParentRef::Id(EntryId(42)));
        let result = rebuild(records, &payloads(&[("file-1", "n:c"), ("file-2", "i:c")]));
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_web_client_records() {
        let json = r#"[
            {"generic": "file-0", "name": "Docs", "type": "folder"},
            {"generic": "file-1", "name": "a.txt", "type": "text", "parent": "Docs"},
            {"generic": "file-2", "name": "b.txt", "type": "text", "parent": "Gone"}
        ]"#;
        let records: Vec<IndexRecord> = serde_json::from_str(json).unwrap();
        let rebuilt = rebuild(records, &payloads(&[("file-1", "a:b"), ("file-2", "c:d")])).unwrap();

        let entries = rebuilt.entries();
        assert_eq!(entries[1].parent, Some(entries[0].id));
        assert_eq!(entries[2].parent, None);
        assert_eq!(entries[1].ciphertext, "a:b");
    }
}
