//! Storage sources for SafeBox.
//!
//! A source is a place where ciphertext blobs live. Sources move opaque
//! bytes only; encryption happens above this layer. Variants are resolved
//! from their configuration through [`SourceRegistry`].

pub mod config;
pub mod kv;
pub mod local;
pub mod registry;
pub mod remote;
pub mod source;

pub use config::SourceConfig;
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use local::LocalSource;
pub use registry::{LocalFactory, RemoteApiFactory, SourceContext, SourceFactory, SourceRegistry};
pub use remote::{HttpResponse, HttpTransport, RemoteApiSource, ReqwestTransport};
pub use source::{Source, SourceEntry, SourceEntryKind};
