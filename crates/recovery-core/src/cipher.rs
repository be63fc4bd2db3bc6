use crate::error::{CipherError, SessionError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;

const KEY_CONTEXT: &str = "recovery-sync channel payload v1";
const NONCE_LEN: usize = 24;

/// Shared secret handed over out of band (QR scan). Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey(String);

impl SymmetricKey {
    pub fn new(value: impl Into<String>) -> Result<Self, SessionError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SessionError::EmptyKey);
        }
        Ok(Self(value))
    }

    /// Raw key material, for cipher implementations only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

pub trait PayloadCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, ciphertext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CipherError>;
}

/// XChaCha20-Poly1305 over a blake3-derived key. Blobs travel as base64 text
/// of `nonce || ciphertext`.
#[derive(Clone, Copy, Debug, Default)]
pub struct XChaChaCipher;

impl XChaChaCipher {
    pub fn new() -> Self {
        Self
    }

    fn aead(key: &SymmetricKey) -> XChaCha20Poly1305 {
        let derived = blake3::derive_key(KEY_CONTEXT, key.expose().as_bytes());
        XChaCha20Poly1305::new(Key::from_slice(&derived))
    }
}

impl PayloadCipher for XChaChaCipher {
    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let sealed = Self::aead(key)
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CipherError::InvalidKey)?;
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out).into_bytes())
    }

    fn decrypt(&self, ciphertext: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CipherError> {
        let text = std::str::from_utf8(ciphertext).map_err(|_| CipherError::Encoding)?;
        let raw = STANDARD
            .decode(text.trim())
            .map_err(|_| CipherError::Encoding)?;
        if raw.len() <= NONCE_LEN {
            return Err(CipherError::Decryption);
        }
        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        Self::aead(key)
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Decryption)
    }
}
