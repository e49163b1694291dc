//! Names inside the archive container.

use safebox_common::SourceIndex;

/// Base64 salt of the index key.
pub const SALT_FILE: &str = "vault.salt";

/// Encrypted index file name inside a source section.
pub const INDEX_FILE: &str = "vault-index.json.enc";

const SOURCE_PREFIX: &str = "source-";

/// Generic payload name of the entry at `position`.
pub fn generic_name(position: usize) -> String {
    format!("file-{}", position)
}

/// Directory of a source section, with trailing slash.
pub fn source_dir(index: SourceIndex) -> String {
    format!("{}{}/", SOURCE_PREFIX, index)
}

pub fn index_path(index: SourceIndex) -> String {
    format!("{}{}", source_dir(index), INDEX_FILE)
}

pub fn payload_path(index: SourceIndex, generic: &str) -> String {
    format!("{}{}", source_dir(index), generic)
}

/// Split a container path into its source index and the name inside the
/// section. Paths outside any section yield `None`.
pub fn split_path(path: &str) -> Option<(SourceIndex, &str)> {
    let rest = path.strip_prefix(SOURCE_PREFIX)?;
    let (idx, name) = rest.split_once('/')?;
    if idx.is_empty() || !idx.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let idx = idx.parse().ok()?;
    Some((SourceIndex(idx), name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let idx = SourceIndex(2);
        assert_eq!(index_path(idx), "source-2/vault-index.json.enc");
        assert_eq!(payload_path(idx, &generic_name(7)), "source-2/file-7");
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("source-12/file-0"),
            Some((SourceIndex(12), "file-0"))
        );
        assert_eq!(split_path("source-1/"), Some((SourceIndex(1), "")));
        assert_eq!(split_path("vault.salt"), None);
        assert_eq!(split_path("source-x/file-0"), None);
        assert_eq!(split_path("source-+1/file-0"), None);
    }
}
