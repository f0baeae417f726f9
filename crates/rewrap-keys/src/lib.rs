//! # Rewrap Keys
//!
//! The tenant key hierarchy and the resolver that walks it.
//!
//! ## Hierarchy
//!
//! ```text
//! root data key ──┬── tree key ──┬── team keys
//!                 │              └── role keys, tenant private key
//!                 └── team keys (legacy wrap)
//! tenant private key ── user data keys
//! ```
//!
//! ## Discriminants
//!
//! | key type                 | ancestor            | cipher                          |
//! |--------------------------|---------------------|---------------------------------|
//! | `EncryptedByDataKey`     | root data key       | AES-256 key wrap (RFC 3394)     |
//! | `EncryptedByPublicKey`   | tenant private key  | X25519 + ChaCha20-Poly1305      |
//! | `EncryptedByTreeKey`     | tree key            | AES-256-GCM, versioned envelope |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rewrap_keys::{KeyResolver, SessionKeyContext, SymmetricKey, X25519StaticSecret};
//!
//! let session = SessionKeyContext::new(
//!     SymmetricKey::generate(),
//!     SymmetricKey::generate(),
//!     Some(X25519StaticSecret::generate()),
//! );
//! let mut resolver = KeyResolver::new(&session);
//! // let team_key = resolver.resolve(&record)?;
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod resolver;
pub mod sealed;
pub mod session;
pub mod wrap;

pub use crypto::{
    EncryptionNonce, EphemeralKeyPair, SharedKey, SymmetricKey, X25519PublicKey,
    X25519StaticSecret, KEY_SIZE,
};
pub use envelope::{EnvelopeFormat, KeyEnvelope};
pub use error::{Ancestor, KeyError, Result};
pub use resolver::KeyResolver;
pub use sealed::SealedKey;
pub use session::{SessionKeyContext, TenantKeyMaterial};
pub use wrap::{wrap_for_device, wrap_for_recipient};
