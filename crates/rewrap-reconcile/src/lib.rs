//! # Rewrap Reconcile
//!
//! The reconciliation passes: discover entities pending a key grant,
//! resolve the protecting key through the session's key hierarchy, re-wrap
//! it for the recipient, and submit the grants in pages.
//!
//! ## Key Types
//!
//! - [`BatchSubmitter`] - Ordered, paged submission with partial-progress results
//! - [`DeviceReconciler`] - Device login approvals (user data keys)
//! - [`TeamReconciler`] - Team creation, then team memberships (team keys)
//! - [`RoleReconciler`] - Role administrator grants (tree key and role keys)
//! - [`PassReport`] - Outcomes, skips, and the fatal error of one pass
//!
//! ## Error Model
//!
//! A key that does not decrypt, or a recipient without a usable public
//! key, only skips the grants that depend on it. A failed remote call or a
//! short response ends the pass; outcomes collected before it are kept in
//! the report.
//!
//! ```text
//! fetch pending ──► resolve protecting keys ──► wrap for recipients ──► submit pages
//!                        │ (KeyResolver)              │                    │
//!                        └── skip ◄───────────────────┘                    └── halt
//! ```

pub mod batch;
pub mod config;
pub mod devices;
pub mod error;
pub mod report;
pub mod roles;
pub mod teams;

pub use batch::{BatchResult, BatchSubmitter};
pub use config::{PageLimits, ReconcileConfig};
pub use devices::DeviceReconciler;
pub use error::{ReconcileError, Result};
pub use report::{
    FatalError, FatalKind, GrantOutcome, PassReport, SkipReason, SkippedGrant, Submission,
    TeamCreationOutcome,
};
pub use roles::RoleReconciler;
pub use teams::TeamReconciler;
