//! Error types for the run coordinator.
//!
//! Only errors the invoking trigger has to act on are returned. Transport
//! failures and protocol anomalies end the pass but are reported in its
//! [`rewrap_reconcile::PassReport`].

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced to the trigger that invoked a pass.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Another pass held the guard for the whole acquisition timeout.
    #[error("reconciliation guard not acquired within {0:?}")]
    GuardTimeout(Duration),

    /// The tenant has no usable key material.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for coordinator operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;
