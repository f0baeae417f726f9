//! # Rewrap
//!
//! A reconciliation engine that re-wraps tenant keys for recipients who are
//! waiting for access.
//!
//! ## Overview
//!
//! An administrator session holds the tenant's ancestor keys. Each pass asks
//! the directory what is pending and grants it:
//!
//! - **Devices**: a user's data key, sealed to a device awaiting approval
//! - **Teams**: queued teams are created, then team keys are sealed to
//!   queued members
//! - **Roles**: the tree key and the role key, sealed to new role admins
//!
//! Grants that cannot be made are skipped with a reason; the rest are
//! submitted in pages, and every pass ends in a [`PassReport`].
//!
//! ## Key Concepts
//!
//! - **Pass**: one run of the reconcilers for a [`Scope`]. Passes never
//!   overlap.
//! - **Trigger**: a timer, a device approval notification, or a manual call.
//! - **Idempotence**: a grant the directory accepted is no longer pending, so
//!   a repeated pass does nothing new.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use rewrap::{Coordinator, CoordinatorConfig, Scope, Trigger};
//! use rewrap::directory::MemoryDirectory;
//! use rewrap::keys::{SymmetricKey, TenantKeyMaterial};
//!
//! async fn example(material: TenantKeyMaterial, data_key: SymmetricKey) {
//!     let directory = Arc::new(MemoryDirectory::new());
//!     let coordinator = Arc::new(
//!         Coordinator::unlock(directory, &material, data_key, None, CoordinatorConfig::default())
//!             .unwrap(),
//!     );
//!
//!     // One pass on demand
//!     let report = coordinator.run_pass(Scope::Both, Trigger::Manual).await.unwrap();
//!     println!("{} grants accepted", report.succeeded());
//!
//!     // Or keep reconciling in the background
//!     let (stop, shutdown) = tokio::sync::watch::channel(false);
//!     let timers = coordinator.spawn_timers(shutdown);
//!     stop.send(true).unwrap();
//!     for timer in timers {
//!         timer.await.unwrap();
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `rewrap::core` - Identifiers, key records, and pending grants
//! - `rewrap::keys` - Key wrapping and the per-pass key resolver
//! - `rewrap::directory` - The directory interface and an in-memory directory
//! - `rewrap::reconcile` - The reconcilers, paged submission, and reports

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod triggers;

// Re-export component crates
pub use rewrap_core as core;
pub use rewrap_directory as directory;
pub use rewrap_keys as keys;
pub use rewrap_reconcile as reconcile;

// Re-export main types for convenience
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, RunState};
pub use diagnostics::{DiagnosticsSink, DrainedPass, MemorySink, TracingSink};
pub use error::{CoordinatorError, Result};
pub use triggers::{NotificationEvent, Trigger};

// Re-export commonly used types
pub use rewrap_core::{KeyOwner, KeyType, PendingGrant, Scope};
pub use rewrap_reconcile::{PassReport, SkipReason, Submission};
