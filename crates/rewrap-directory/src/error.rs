//! Error types for directory calls.

use std::time::Duration;

use thiserror::Error;

/// A remote directory call that did not produce a response.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The call failed in the transport or the remote service.
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    /// The call did not complete in time.
    #[error("directory call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for directory calls.
pub type Result<T> = std::result::Result<T, DirectoryError>;
