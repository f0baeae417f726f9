//! Error types for reconciliation passes.
//!
//! Only pass-fatal conditions are errors. Per-grant problems (a key that
//! does not decrypt, a missing public key) are recorded as skips in the
//! [`crate::PassReport`] and never surface here.

use thiserror::Error;

use rewrap_directory::DirectoryError;

/// Errors that end a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A remote call failed outright.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A submission answered with a different number of outcomes than
    /// commands sent.
    #[error("protocol anomaly on page {page}: sent {sent} commands, received {received} outcomes")]
    ProtocolAnomaly {
        page: usize,
        sent: usize,
        received: usize,
    },

    /// The tenant has no usable key material for this pass.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, ReconcileError>;
