//! Remote-API backed source.
//!
//! Talks to an OpenDrive-style JSON-over-POST backend. Every request
//! carries the account credentials; payloads travel as base64 strings.

mod client;
mod source;
mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{
    handle_response, FolderListing, RemoteClient, RemoteFile, RemoteFolder, DEFAULT_BASE_URL,
    ROOT_FOLDER_ID,
};
pub use source::RemoteApiSource;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
