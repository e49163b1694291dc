//! Vault entry records.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use safebox_common::{EntryId, SensitiveBytes};

/// Kind of a vault entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Image,
    Text,
    Video,
    Folder,
}

impl EntryKind {
    pub fn is_folder(self) -> bool {
        self == EntryKind::Folder
    }

    /// Guess the kind of a file from its extension. Unknown extensions are text.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "heic" => EntryKind::Image,
            "mp4" | "webm" | "mov" | "mkv" | "avi" | "m4v" => EntryKind::Video,
            _ => EntryKind::Text,
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Image => "image",
            EntryKind::Text => "text",
            EntryKind::Video => "video",
            EntryKind::Folder => "folder",
        };
        f.write_str(s)
    }
}

/// Decoded content kept in memory while an entry is unlocked.
#[derive(Clone, PartialEq, Eq)]
pub enum PlaintextCache {
    Text(Zeroizing<String>),
    Binary(SensitiveBytes),
}

impl PlaintextCache {
    /// Build the cache for an entry of `kind`. Text entries that are not
    /// valid UTF-8 fall back to binary.
    pub fn for_kind(kind: EntryKind, data: Vec<u8>) -> Self {
        match kind {
            EntryKind::Text => match String::from_utf8(data) {
                Ok(text) => PlaintextCache::Text(Zeroizing::new(text)),
                Err(e) => PlaintextCache::Binary(SensitiveBytes::new(e.into_bytes())),
            },
            _ => PlaintextCache::Binary(SensitiveBytes::new(data)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PlaintextCache::Text(text) => text.as_bytes(),
            PlaintextCache::Binary(bytes) => bytes.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PlaintextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaintextCache::Text(t) => write!(f, "Text([REDACTED; {} bytes])", t.len()),
            PlaintextCache::Binary(b) => write!(f, "Binary([REDACTED; {} bytes])", b.len()),
        }
    }
}

/// One file or folder in a source.
///
/// Only `ciphertext` and the structural fields are durable. The plaintext
/// cache and thumbnail exist while the entry is unlocked and are never
/// serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: EntryId,
    pub name: String,
    pub kind: EntryKind,
    /// Framed ciphertext; empty for folders.
    #[serde(default)]
    pub ciphertext: String,
    #[serde(skip)]
    pub plaintext: Option<PlaintextCache>,
    #[serde(skip)]
    pub thumbnail: Option<SensitiveBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Tags and notes encrypted together, when sealed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed_metadata: Option<String>,
}

impl FileEntry {
    /// A non-folder entry holding only ciphertext.
    pub fn file(
        id: EntryId,
        name: impl Into<String>,
        kind: EntryKind,
        ciphertext: impl Into<String>,
        parent: Option<EntryId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            ciphertext: ciphertext.into(),
            plaintext: None,
            thumbnail: None,
            parent,
            tags: Vec::new(),
            notes: None,
            sealed_metadata: None,
        }
    }

    /// A folder entry.
    pub fn folder(id: EntryId, name: impl Into<String>, parent: Option<EntryId>) -> Self {
        Self::file(id, name, EntryKind::Folder, String::new(), parent)
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }

    /// Check if decoded content is cached.
    pub fn is_unlocked(&self) -> bool {
        self.plaintext.is_some()
    }

    /// Drop the transient cache and thumbnail. Ciphertext is untouched.
    pub fn lock(&mut self) {
        self.plaintext = None;
        self.thumbnail = None;
    }

    /// Copy without the transient fields.
    pub fn durable(&self) -> Self {
        let mut copy = self.clone();
        copy.lock();
        copy
    }
}
