// crates/vet-clinic-core/src/runtime/cipher.rs
// ============================================================================
// Module: Field Cipher
// Description: AES-256-GCM field cipher and the safe-decrypt wrapper.
// Purpose: Keep PII columns ciphertext-at-rest without failing reads on legacy data.
// Dependencies: crate::{core, interfaces}, aes-gcm, base64, rand, sha2, tracing
// ============================================================================

//! ## Overview
//! Encrypted values use the envelope `enc:v1:<base64(nonce || ciphertext)>`
//! with a fresh 96-bit nonce per value. The key is the SHA-256 digest of a
//! configured passphrase.
//!
//! [`safe_decrypt`] applies one fallback policy everywhere: empty input yields
//! an empty string, and any value that fails to decrypt is returned unchanged.
//! Plaintext rows written before encryption was enabled therefore stay readable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use aes_gcm::Aes256Gcm;
use aes_gcm::KeyInit;
use aes_gcm::Nonce;
use aes_gcm::aead::Aead;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tracing::debug;

use crate::core::FieldMap;
use crate::core::TableSpec;
use crate::interfaces::CipherError;
use crate::interfaces::FieldCipher;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix marking an encrypted field value.
pub const CIPHERTEXT_PREFIX: &str = "enc:v1:";
/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

// ============================================================================
// SECTION: AES-GCM Cipher
// ============================================================================

/// AES-256-GCM field cipher.
#[derive(Clone)]
pub struct AesGcmFieldCipher {
    /// Initialized cipher instance.
    cipher: Aes256Gcm,
}

impl AesGcmFieldCipher {
    /// Derives the key from a passphrase with SHA-256.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] when the passphrase is empty.
    pub fn from_passphrase(passphrase: &str) -> Result<Self, CipherError> {
        if passphrase.is_empty() {
            return Err(CipherError::Key("passphrase must be non-empty".to_string()));
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        Self::from_key(digest.as_slice())
    }

    /// Builds the cipher from raw 32-byte key material.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::Key`] when the key is not 32 bytes.
    pub fn from_key(key: &[u8]) -> Result<Self, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| CipherError::Key(format!("expected 32 key bytes, got {}", key.len())))?;
        Ok(Self {
            cipher,
        })
    }
}

impl FieldCipher for AesGcmFieldCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0_u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|err| CipherError::Encrypt(err.to_string()))?;
        let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&sealed);
        Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(envelope)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let encoded = ciphertext.strip_prefix(CIPHERTEXT_PREFIX).ok_or(CipherError::NotEncrypted)?;
        let envelope =
            STANDARD.decode(encoded).map_err(|err| CipherError::Malformed(err.to_string()))?;
        if envelope.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::Malformed("envelope too short".to_string()));
        }
        let (nonce_bytes, sealed) = envelope.split_at(NONCE_LEN);
        let opened = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CipherError::Authentication)?;
        String::from_utf8(opened).map_err(|err| CipherError::Malformed(err.to_string()))
    }
}

// ============================================================================
// SECTION: Safe Decrypt
// ============================================================================

/// Decrypts a stored value without failing the read.
///
/// Missing or empty input yields an empty string; anything that does not
/// decrypt is returned as-is.
#[must_use]
pub fn safe_decrypt(cipher: &dyn FieldCipher, value: Option<&str>) -> String {
    let Some(value) = value.filter(|value| !value.is_empty()) else {
        return String::new();
    };
    match cipher.decrypt(value) {
        Ok(plaintext) => plaintext,
        Err(CipherError::NotEncrypted) => value.to_string(),
        Err(error) => {
            debug!(error = %error, "field did not decrypt, passing through");
            value.to_string()
        }
    }
}

/// Encrypts every non-empty string in the table's encrypted columns.
///
/// # Errors
///
/// Returns [`CipherError`] when encryption fails.
pub fn encrypt_columns(
    cipher: &dyn FieldCipher,
    table: &TableSpec,
    row: &mut FieldMap,
) -> Result<(), CipherError> {
    for column in table.columns.iter().filter(|column| column.encrypted) {
        if let Some(Value::String(text)) = row.get_mut(column.column)
            && !text.is_empty()
        {
            *text = cipher.encrypt(text)?;
        }
    }
    Ok(())
}

/// Decrypts the table's encrypted columns and encrypted join aliases in place.
pub fn decrypt_columns(cipher: &dyn FieldCipher, table: &TableSpec, row: &mut FieldMap) {
    let table_columns =
        table.columns.iter().filter(|column| column.encrypted).map(|column| column.column);
    let join_aliases = table
        .joins
        .iter()
        .flat_map(|join| join.columns.iter())
        .filter(|column| column.encrypted)
        .map(|column| column.alias);
    for name in table_columns.chain(join_aliases) {
        if let Some(slot) = row.get_mut(name)
            && let Value::String(text) = slot
        {
            *text = safe_decrypt(cipher, Some(text.as_str()));
        }
    }
}
