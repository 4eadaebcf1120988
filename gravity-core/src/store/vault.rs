//! Symmetric sealing of table blobs (ChaCha20-Poly1305).
//!
//! Blob layout: `b"GRV1" | nonce (12 bytes) | ciphertext+tag`. A fresh random
//! nonce is drawn for every seal, so sealing the same bytes twice yields
//! different blobs.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use std::fmt;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"GRV1";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VaultError {
    #[error("encryption key must be 32 bytes of URL-safe base64 (got {0} bytes)")]
    BadKeyLength(usize),

    #[error("encryption key is not valid base64: {0}")]
    BadKeyEncoding(String),

    #[error("blob is not a sealed table (bad header)")]
    BadHeader,

    #[error("decryption failed: wrong key or corrupted blob")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,
}

pub struct Vault {
    cipher: ChaCha20Poly1305,
}

impl fmt::Debug for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Vault(..)")
    }
}

impl Vault {
    pub fn from_key_bytes(key: &[u8]) -> Result<Self, VaultError> {
        if key.len() != KEY_LEN {
            return Err(VaultError::BadKeyLength(key.len()));
        }
        let cipher =
            ChaCha20Poly1305::new_from_slice(key).map_err(|_| VaultError::BadKeyLength(key.len()))?;
        Ok(Self { cipher })
    }

    /// Parse a URL-safe base64 key, as produced by [`Vault::generate_key`].
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let bytes = URL_SAFE
            .decode(encoded.trim())
            .map_err(|e| VaultError::BadKeyEncoding(e.to_string()))?;
        Self::from_key_bytes(&bytes)
    }

    /// Fresh random key, URL-safe base64 encoded.
    pub fn generate_key() -> String {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        URL_SAFE.encode(key.as_slice())
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::Encrypt)?;

        let mut blob = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(MAGIC);
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    pub fn open(&self, blob: &[u8]) -> Result<Vec<u8>, VaultError> {
        if blob.len() < MAGIC.len() + NONCE_LEN || &blob[..MAGIC.len()] != MAGIC {
            return Err(VaultError::BadHeader);
        }
        let (nonce, ciphertext) = blob[MAGIC.len()..].split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_roundtrips() {
        let vault = Vault::from_base64(&Vault::generate_key()).unwrap();
        let blob = vault.seal(b"parquet bytes").unwrap();
        assert_ne!(&blob[MAGIC.len() + NONCE_LEN..], b"parquet bytes");
        assert_eq!(vault.open(&blob).unwrap(), b"parquet bytes");
    }

    #[test]
    fn wrong_key_fails() {
        let a = Vault::from_base64(&Vault::generate_key()).unwrap();
        let b = Vault::from_base64(&Vault::generate_key()).unwrap();
        let blob = a.seal(b"secret").unwrap();
        assert_eq!(b.open(&blob), Err(VaultError::Decrypt));
    }

    #[test]
    fn tampered_blob_fails() {
        let vault = Vault::from_base64(&Vault::generate_key()).unwrap();
        let mut blob = vault.seal(b"secret").unwrap();
        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert_eq!(vault.open(&blob), Err(VaultError::Decrypt));
    }

    #[test]
    fn rejects_bad_keys_and_headers() {
        assert!(matches!(
            Vault::from_key_bytes(&[0u8; 16]),
            Err(VaultError::BadKeyLength(16))
        ));
        assert!(matches!(
            Vault::from_base64("not base64 !!"),
            Err(VaultError::BadKeyEncoding(_))
        ));
        let vault = Vault::from_key_bytes(&[7u8; 32]).unwrap();
        assert_eq!(vault.open(b"nope"), Err(VaultError::BadHeader));
    }
}
