//! Commands submitted to the directory and the per-item outcomes it returns.

use serde::{Deserialize, Serialize};

use rewrap_core::{
    DeviceToken, EncryptedKeyRecord, KeyOwner, KeyType, RoleId, TeamDescriptor, TeamUid, UserId,
};

/// Approve a device by handing it its user's data key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceApproval {
    pub user_id: UserId,
    pub device_token: DeviceToken,

    /// The user's data key, sealed to the device public key.
    pub encrypted_data_key: Vec<u8>,
}

/// Create a queued team together with its key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCreation {
    pub team: TeamDescriptor,

    /// Team key wrapped by the root data key (legacy form).
    pub team_key_by_data_key: Vec<u8>,

    /// Team key in a tree-key envelope.
    pub team_key_by_tree_key: Vec<u8>,

    /// X25519 team public key.
    pub team_public_key: [u8; 32],

    /// Team private key in an envelope under the team key.
    pub encrypted_team_private_key: Vec<u8>,
}

impl TeamCreation {
    /// The protecting-key records this creation leaves behind in the directory.
    pub fn protecting_keys(&self) -> [EncryptedKeyRecord; 2] {
        let owner = KeyOwner::Team(self.team.team_uid);
        [
            EncryptedKeyRecord::new(
                owner,
                self.team_key_by_data_key.clone(),
                KeyType::EncryptedByDataKey,
            ),
            EncryptedKeyRecord::new(
                owner,
                self.team_key_by_tree_key.clone(),
                KeyType::EncryptedByTreeKey,
            ),
        ]
    }
}

/// Add a user to a team with the team key wrapped for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembershipGrant {
    pub team_uid: TeamUid,
    pub user_id: UserId,
    pub username: String,

    /// The team key, encrypted to the user's public key.
    pub encrypted_team_key: Vec<u8>,

    /// How `encrypted_team_key` is to be opened by the user.
    pub key_type: KeyType,
}

/// Give a role administrator the keys the role needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAdminGrant {
    pub role_id: RoleId,
    pub user_id: UserId,

    /// The tenant tree key, encrypted to the user's public key.
    pub encrypted_tree_key: Vec<u8>,

    /// The role key, encrypted to the user's public key. `None` when the role
    /// has no key of its own yet.
    pub encrypted_role_key: Option<Vec<u8>>,
}

/// What the directory reported for one submitted command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteOutcome {
    Accepted,
    Rejected(String),
}

impl RemoteOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RemoteOutcome::Accepted)
    }
}
