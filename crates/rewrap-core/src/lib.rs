//! # Rewrap Core
//!
//! Plain records shared by every rewrap crate: identities, the records the
//! enterprise directory hands back, and the key-type discriminant that says
//! how a protecting key was encrypted.
//!
//! This crate contains no cryptography and no I/O.
//!
//! ## Key Types
//!
//! - [`KeyOwner`] - Identity of a protecting key (tenant, user, team, role)
//! - [`KeyType`] - Discriminant naming the ancestor key and cipher of a record
//! - [`EncryptedKeyRecord`] - An owner, its ciphertext, and its raw discriminant
//! - [`PendingGrant`] - A device, team membership, or role admin grant awaiting keys

pub mod directory;
pub mod error;
pub mod grant;
pub mod key;
pub mod types;

pub use directory::{
    DeviceApprovalRequest, DirectoryUser, PendingRoleAdmin, QueuedMembership, TeamDescriptor,
    TeamMember, UserPublicKey, UserStatus,
};
pub use error::{CoreError, Result};
pub use grant::{PendingGrant, Scope};
pub use key::{EncryptedKeyRecord, KeyType, RecipientPublicKey, EC_PUBLIC_KEY_LEN};
pub use types::{DeviceToken, KeyOwner, NodeId, RoleId, TeamUid, UserId};
