//! Authenticated encryption for archive blobs using AES-256-GCM.
//!
//! Every call to `encrypt` draws a fresh random nonce, so encrypting the
//! same archive twice yields different blobs. The nonce is prepended to the
//! ciphertext; the GCM tag rides at the end of it.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::utils::errors::{BackupError, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

/// Key size for AES-256
const KEY_SIZE: usize = 32;

/// Fixed blob overhead: prepended nonce plus appended tag.
pub const BLOB_OVERHEAD: usize = NONCE_SIZE + TAG_SIZE;

/// A 256-bit symmetric key obtained from external configuration.
///
/// The codec never generates or persists production keys; `generate` exists
/// for provisioning tooling and tests.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_SIZE]);

impl EncryptionKey {
    /// Decode a key from its base64 representation.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| BackupError::Config(format!("encryption key is not valid base64: {e}")))?;
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            BackupError::Config(format!(
                "encryption key must be {KEY_SIZE} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Base64 form, for writing provisioned keys out to configuration.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

// Key material must never end up in logs.
impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Encrypt `plaintext`, returning `nonce || ciphertext+tag`.
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| BackupError::Authentication(format!("cipher init failed: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| BackupError::Authentication("encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by `encrypt`.
///
/// Fails with an authentication error on a wrong key, truncation, or any
/// tampering; never returns partial plaintext.
pub fn decrypt(blob: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if blob.len() < BLOB_OVERHEAD {
        return Err(BackupError::Authentication(
            "blob too short to contain nonce and tag".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| BackupError::Authentication(format!("cipher init failed: {e}")))?;

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        BackupError::Authentication("tag verification failed: wrong key or tampered data".to_string())
    })
}
