//! Portable vault archives for SafeBox.
//!
//! An archive is a ZIP container holding, per source, the entries'
//! ciphertext under generic names (`source-<idx>/file-<pos>`) and an
//! encrypted index (`source-<idx>/vault-index.json.enc`) that maps those
//! names back to entry names and folders. Nothing in the container's
//! table of contents reveals original names or structure.

pub mod codec;
pub mod deliver;
pub mod index;
pub mod layout;

pub use codec::ArchiveCodec;
pub use deliver::{deliver, Delivery, FileSave, SaveCapability, SUGGESTED_FILE_NAME};
pub use index::{IndexRecord, ParentRef};
