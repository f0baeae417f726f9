//! Encrypted key records and their type discriminant.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::KeyOwner;

/// Length of an EC (X25519) public key.
pub const EC_PUBLIC_KEY_LEN: usize = 32;

/// How a protecting key was encrypted.
///
/// Each variant names exactly one ancestor key and one cipher. The wire
/// value is kept on [`EncryptedKeyRecord`] as a raw `u32` and only turned
/// into a `KeyType` at resolution time, so an unknown value surfaces as an
/// error for that record instead of failing the whole fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum KeyType {
    /// Legacy AES key wrap under the session root data key.
    EncryptedByDataKey = 1,
    /// Sealed to the session private key (X25519 + ChaCha20-Poly1305).
    EncryptedByPublicKey = 2,
    /// Versioned AES-GCM envelope under the tenant tree key.
    EncryptedByTreeKey = 3,
}

impl KeyType {
    /// Wire value of this discriminant.
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for KeyType {
    type Error = CoreError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            1 => Ok(KeyType::EncryptedByDataKey),
            2 => Ok(KeyType::EncryptedByPublicKey),
            3 => Ok(KeyType::EncryptedByTreeKey),
            other => Err(CoreError::UnsupportedKeyType(other)),
        }
    }
}

impl From<KeyType> for u32 {
    fn from(kt: KeyType) -> Self {
        kt.as_u32()
    }
}

/// A protecting key as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyRecord {
    /// Whose key this is.
    pub owner: KeyOwner,

    /// The encrypted key bytes.
    pub ciphertext: Vec<u8>,

    /// Raw key-type discriminant.
    pub key_type: u32,
}

impl EncryptedKeyRecord {
    /// Create a record with a known discriminant.
    pub fn new(owner: KeyOwner, ciphertext: Vec<u8>, key_type: KeyType) -> Self {
        Self {
            owner,
            ciphertext,
            key_type: key_type.as_u32(),
        }
    }

    /// Interpret the raw discriminant.
    pub fn key_type(&self) -> Result<KeyType> {
        KeyType::try_from(self.key_type)
    }
}

/// A recipient's public key as published in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipientPublicKey {
    /// X25519 public key.
    Ec([u8; EC_PUBLIC_KEY_LEN]),
    /// DER-encoded RSA public key.
    Rsa(Vec<u8>),
}

impl RecipientPublicKey {
    /// Parse an EC public key from raw bytes.
    pub fn ec_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; EC_PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CoreError::InvalidPublicKey {
                expected: EC_PUBLIC_KEY_LEN,
                got: bytes.len(),
            })?;
        Ok(RecipientPublicKey::Ec(arr))
    }
}
