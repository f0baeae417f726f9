//! Error types for key operations.

use std::fmt;

use rewrap_core::{CoreError, KeyOwner};
use thiserror::Error;

/// Ancestor keys held by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ancestor {
    DataKey,
    PrivateKey,
    TreeKey,
}

impl fmt::Display for Ancestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ancestor::DataKey => write!(f, "root data key"),
            Ancestor::PrivateKey => write!(f, "tenant private key"),
            Ancestor::TreeKey => write!(f, "tree key"),
        }
    }
}

/// Errors that can occur while wrapping or unwrapping keys.
///
/// Every variant raised by the resolver is recoverable: the grant that
/// referenced the key is skipped and the pass continues.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The record's discriminant is not one of the known forms.
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(u32),

    /// The session does not hold the ancestor the discriminant names.
    #[error("session has no {0}")]
    MissingAncestor(Ancestor),

    /// No record was available for the key owner.
    #[error("no protecting key for {0}")]
    NoRecord(KeyOwner),

    /// The ciphertext could not be parsed.
    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    /// Authentication failed (wrong key or corrupt ciphertext).
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Encryption error.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// A decrypted key had the wrong size.
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    /// The recipient's public key cannot be used.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl From<CoreError> for KeyError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::UnsupportedKeyType(v) => KeyError::UnsupportedKeyType(v),
            CoreError::InvalidPublicKey { .. } => KeyError::InvalidPublicKey(e.to_string()),
            CoreError::InvalidIdentifier(msg) => KeyError::Malformed(msg),
        }
    }
}

/// Result type for key operations.
pub type Result<T> = std::result::Result<T, KeyError>;
