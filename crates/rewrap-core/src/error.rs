//! Error types for rewrap core records.

use thiserror::Error;

/// Errors raised while interpreting directory records.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(u32),

    #[error("invalid public key length: expected {expected}, got {got}")]
    InvalidPublicKey { expected: usize, got: usize },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
