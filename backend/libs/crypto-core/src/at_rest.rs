//! AES-256-GCM codec for message text at rest.
//!
//! ## Envelope format
//!
//! Each encrypted value is a single base64 string (standard alphabet, padded) over:
//! - IV (12 bytes): fresh random nonce per call
//! - Tag (16 bytes): GCM authentication tag
//! - Ciphertext (variable)
//!
//! Rows written before encryption was enabled hold plain text. Those values do not
//! survive base64 decoding or authentication, so [`MessageCipher::decrypt`] hands
//! them back unchanged as [`DecryptResult::Fallback`].

use std::fmt;

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce, Tag,
};
use base64::engine::{general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};
use tracing::{debug, warn};

use crate::{CryptoError, CryptoResult};

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
/// Anything shorter than IV + tag cannot be an envelope.
pub const MIN_ENVELOPE_LEN: usize = IV_LEN + TAG_LEN;

/// Why a stored value was returned as-is instead of decrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackReason {
    NotBase64,
    TooShort,
    AuthenticationFailed,
    InvalidUtf8,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NotBase64 => "not_base64",
            FallbackReason::TooShort => "too_short",
            FallbackReason::AuthenticationFailed => "authentication_failed",
            FallbackReason::InvalidUtf8 => "invalid_utf8",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of decrypting a stored value. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptResult {
    Plaintext(String),
    Fallback {
        original: String,
        reason: FallbackReason,
    },
}

impl DecryptResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DecryptResult::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            DecryptResult::Plaintext(_) => None,
            DecryptResult::Fallback { reason, .. } => Some(*reason),
        }
    }

    /// The text to show the reader: plaintext, or the stored value untouched.
    pub fn into_text(self) -> String {
        match self {
            DecryptResult::Plaintext(text) => text,
            DecryptResult::Fallback { original, .. } => original,
        }
    }
}

/// Process-wide message cipher. Construct once at startup and share via `Arc`.
#[derive(Clone)]
pub struct MessageCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCipher").finish_non_exhaustive()
    }
}

impl MessageCipher {
    /// Build from a base64-encoded 256-bit key.
    pub fn from_base64(secret: &str) -> CryptoResult<Self> {
        let key_bytes = STANDARD
            .decode(secret.trim())
            .map_err(|_| CryptoError::KeyNotBase64)?;
        Self::from_bytes(&key_bytes)
    }

    pub fn from_bytes(key_bytes: &[u8]) -> CryptoResult<Self> {
        if key_bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength(key_bytes.len()));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypt message text. `None` and empty text stay `None`.
    pub fn encrypt(&self, plaintext: Option<&str>) -> CryptoResult<Option<String>> {
        let Some(text) = plaintext.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        self.seal(text).map(Some)
    }

    fn seal(&self, text: &str) -> CryptoResult<String> {
        let iv = generate_iv();
        let mut buffer = text.as_bytes().to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
            .map_err(|_| CryptoError::Encryption)?;

        let mut envelope = Vec::with_capacity(MIN_ENVELOPE_LEN + buffer.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(tag.as_slice());
        envelope.extend_from_slice(&buffer);

        Ok(STANDARD.encode(envelope))
    }

    /// Decrypt a stored value, falling back to the input on any failure.
    pub fn decrypt(&self, stored: &str) -> DecryptResult {
        if stored.is_empty() {
            return DecryptResult::Plaintext(String::new());
        }

        let result = self.open(stored);
        if let DecryptResult::Fallback { reason, .. } = &result {
            match reason {
                // Expected for rows written before encryption was enabled
                FallbackReason::NotBase64 | FallbackReason::TooShort => {
                    debug!(reason = %reason, "stored message text is not an envelope");
                }
                FallbackReason::AuthenticationFailed | FallbackReason::InvalidUtf8 => {
                    warn!(
                        reason = %reason,
                        len = stored.len(),
                        "well-formed envelope failed to decrypt; returning stored value"
                    );
                }
            }
        }
        result
    }

    /// Plain string form of [`decrypt`](Self::decrypt).
    pub fn decrypt_text(&self, stored: &str) -> String {
        self.decrypt(stored).into_text()
    }

    fn open(&self, stored: &str) -> DecryptResult {
        let fallback = |reason| DecryptResult::Fallback {
            original: stored.to_string(),
            reason,
        };

        let bytes = match STANDARD.decode(stored) {
            Ok(bytes) => bytes,
            Err(_) => return fallback(FallbackReason::NotBase64),
        };
        if bytes.len() < MIN_ENVELOPE_LEN {
            return fallback(FallbackReason::TooShort);
        }

        let nonce = Nonce::from_slice(&bytes[..IV_LEN]);
        let tag = Tag::from_slice(&bytes[IV_LEN..MIN_ENVELOPE_LEN]);
        let mut buffer = bytes[MIN_ENVELOPE_LEN..].to_vec();

        if self
            .cipher
            .decrypt_in_place_detached(nonce, b"", &mut buffer, tag)
            .is_err()
        {
            return fallback(FallbackReason::AuthenticationFailed);
        }

        match String::from_utf8(buffer) {
            Ok(text) => DecryptResult::Plaintext(text),
            Err(_) => fallback(FallbackReason::InvalidUtf8),
        }
    }
}

/// Random 12-byte IV from the OS CSPRNG.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Fresh base64 key, suitable for `MESSAGE_KEY`.
pub fn generate_key() -> String {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    STANDARD.encode(key)
}
