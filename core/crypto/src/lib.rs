//! Cryptographic primitives and encryption methods for SafeBox.
//!
//! This module provides:
//! - Key derivation using PBKDF2-HMAC-SHA256
//! - Authenticated encryption using AES-256-GCM with a text framing
//!   (`base64(nonce):base64(ciphertext||tag)`)
//! - Windowed base64 so large media payloads encode in bounded chunks
//! - The pluggable encryption-method registry used by vault sources
//!
//! # Security Guarantees
//! - Every encryption draws a fresh random 96-bit nonce
//! - Authentication failures are reported as errors, never as partial plaintext
//! - Key material is zeroized on drop and never logged

pub mod aead;
pub mod encoding;
pub mod engine;
pub mod kdf;
pub mod keys;
pub mod method;

pub use aead::{open, seal};
pub use engine::{decrypt_with_passphrase, encrypt_with_passphrase, CipherEngine};
pub use kdf::{derive_key, KdfParams, Salt};
pub use keys::CipherKey;
pub use method::{
    AlternativeMethod, AsymmetricKeyMethod, EncryptionMethod, MethodConfig, MethodFactory,
    MethodRegistry, SymmetricFactory, SymmetricMethod,
};
