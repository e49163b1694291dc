//! Common error types for SafeBox.

use thiserror::Error;

/// Top-level error type for SafeBox operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A variant configuration is missing or has invalid required fields.
    #[error("Invalid configuration: {0}")]
    ConfigValidation(String),

    /// Remote backend could not be reached or answered with a failure status.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Remote backend rejected the supplied credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Ciphertext framing or encoding is invalid.
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Authentication tag did not verify (tampering or wrong key).
    #[error("Authentication failed: ciphertext was tampered with or the key is wrong")]
    AuthenticationFailure,

    /// Operation exists in the contract but is not implemented by this variant.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Archive container is corrupt or its index cannot be decrypted.
    #[error("Import error: {0}")]
    Import(String),

    /// Cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not permitted.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Entry changed while an operation on it was in flight.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// True for both halves of a remote connectivity failure
    /// (unreachable backend and rejected credentials).
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connectivity(_) | Error::Unauthorized(_))
    }

    /// True for failures raised by the cipher itself, as opposed to
    /// placeholder variants or configuration problems.
    pub fn is_cipher_failure(&self) -> bool {
        matches!(
            self,
            Error::MalformedCiphertext(_) | Error::AuthenticationFailure | Error::Crypto(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(Error::Connectivity("down".into()).is_connectivity());
        assert!(Error::Unauthorized("bad password".into()).is_connectivity());
        assert!(!Error::ConfigValidation("missing".into()).is_connectivity());
    }

    #[test]
    fn test_not_implemented_is_not_cipher_failure() {
        assert!(!Error::NotImplemented("gpg".into()).is_cipher_failure());
        assert!(Error::AuthenticationFailure.is_cipher_failure());
    }
}
