//! Versioned key envelope.
//!
//! Keys protected by the tenant tree key are stored as a CBOR envelope that
//! names its format, so the cipher can change without changing the
//! discriminant.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};

use crate::crypto::{EncryptionNonce, SymmetricKey};
use crate::error::{KeyError, Result};

/// Format identifier for key envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EnvelopeFormat {
    /// AES-256-GCM with a 96-bit random nonce.
    Aes256GcmV2 = 2,
}

/// An encrypted key envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEnvelope {
    /// Cipher used.
    pub format: EnvelopeFormat,

    /// Nonce used for encryption (unique per envelope).
    pub nonce: EncryptionNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl KeyEnvelope {
    /// Encrypt plaintext under the given key.
    pub fn seal(plaintext: &[u8], key: &SymmetricKey) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| KeyError::Encryption(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(nonce.as_bytes()), plaintext)
            .map_err(|e| KeyError::Encryption(e.to_string()))?;

        Ok(Self {
            format: EnvelopeFormat::Aes256GcmV2,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt with the given key.
    pub fn open(&self, key: &SymmetricKey) -> Result<Vec<u8>> {
        match self.format {
            EnvelopeFormat::Aes256GcmV2 => {
                let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
                    .map_err(|e| KeyError::Decryption(e.to_string()))?;
                cipher
                    .decrypt(Nonce::from_slice(self.nonce.as_bytes()), self.ciphertext.as_slice())
                    .map_err(|e| KeyError::Decryption(e.to_string()))
            }
        }
    }

    /// Seal a symmetric key.
    pub fn seal_key(key: &SymmetricKey, under: &SymmetricKey) -> Result<Self> {
        Self::seal(key.as_bytes(), under)
    }

    /// Open an envelope that holds a symmetric key.
    pub fn open_key(&self, key: &SymmetricKey) -> Result<SymmetricKey> {
        let plaintext = self.open(key)?;
        SymmetricKey::try_from_slice(&plaintext)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| KeyError::Malformed(e.to_string()))
    }
}
