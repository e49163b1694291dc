//! Vault engine for SafeBox.
//!
//! This module provides:
//! - The per-source list of encrypted entries and folders
//! - Decrypt, edit and re-encrypt cycles with in-memory plaintext caches
//! - Bulk operations with per-item outcomes and cancellation
//! - Observable configuration of encryption methods and sources
//!
//! # Architecture
//! Entry lists are immutable snapshots replaced on every commit. Readers
//! never block. Async operations serialize through the store's writer
//! guard so a bulk operation never interleaves with another. Synchronous
//! edits commit immediately; an async commit that finds its entry changed
//! since it was read fails with `Error::Conflict`.

pub mod bulk;
pub mod config;
pub mod entries;
pub mod entry;
pub mod metadata;
pub mod store;
pub mod vault;

pub use bulk::{run_bulk, BulkOptions, BulkReport, ItemOutcome};
pub use config::{ConfigService, ConfigSnapshot};
pub use entries::{SourceEntries, TagMatch};
pub use entry::{EntryKind, FileEntry, PlaintextCache};
pub use metadata::SealedMetadata;
pub use store::VaultStore;
pub use vault::Vault;
