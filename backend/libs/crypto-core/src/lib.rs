//! Shared cryptography for the messenger backend.
//!
//! - [`at_rest`]: AES-256-GCM codec for message text stored in the database
//! - [`jwt`]: bearer token validation (HS256, shared secret)

pub mod at_rest;
pub mod jwt;

pub use at_rest::{
    generate_iv, generate_key, DecryptResult, FallbackReason, MessageCipher, IV_LEN, KEY_LEN,
    MIN_ENVELOPE_LEN, TAG_LEN,
};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("message key is not valid base64")]
    KeyNotBase64,
    #[error("message key must decode to 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encryption error")]
    Encryption,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
