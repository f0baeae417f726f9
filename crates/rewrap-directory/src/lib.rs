//! # Rewrap Directory
//!
//! The enterprise directory as the reconciliation passes consume it. The
//! remote transport and session are opaque; a pass only sees the
//! [`Directory`] trait.
//!
//! ## Key Types
//!
//! - [`Directory`] - The async trait for every remote fetch and submit
//! - [`MemoryDirectory`] - In-memory tenant for tests, with call logging and fault injection
//! - [`RemoteOutcome`] - Per-command result of a submission
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rewrap_directory::{Directory, MemoryDirectory};
//!
//! async fn example() {
//!     let directory = MemoryDirectory::new();
//!     let pending = directory.fetch_pending_device_approvals().await.unwrap();
//!     assert!(pending.is_empty());
//! }
//! ```

pub mod commands;
pub mod error;
pub mod memory;
pub mod traits;

pub use commands::{
    DeviceApproval, RemoteOutcome, RoleAdminGrant, TeamCreation, TeamMembershipGrant,
};
pub use error::{DirectoryError, Result};
pub use memory::{CallRecord, DirectoryCall, MemoryDirectory};
pub use traits::Directory;
