//! # Rewrap Testkit
//!
//! Testing utilities for rewrap.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a [`TenantFixture`] that generates a tenant key hierarchy
//!   and wires users, devices, teams, and roles into a `MemoryDirectory`
//! - **Generators**: Proptest strategies for identifiers and pending grants
//! - **Tracing**: [`init_tracing`] for readable logs in failing tests
//!
//! ## Test Fixtures
//!
//! ```rust
//! use rewrap_testkit::TenantFixture;
//!
//! let tenant = TenantFixture::new();
//! let alice = tenant.add_user(1);
//! tenant.add_device(alice.id);
//!
//! let session = tenant.session();
//! assert!(session.private_key().is_some());
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{DeviceHandle, RsaUserHandle, TenantFixture, UserHandle};

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
