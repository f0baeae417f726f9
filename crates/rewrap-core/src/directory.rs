//! Records fetched from the enterprise directory.

use serde::{Deserialize, Serialize};

use crate::key::RecipientPublicKey;
use crate::types::{DeviceToken, NodeId, RoleId, TeamUid, UserId};

/// A device waiting for an administrator to approve its login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceApprovalRequest {
    /// The user the device belongs to.
    pub user_id: UserId,

    /// Token identifying the device.
    pub device_token: DeviceToken,

    /// Raw device public key. Validated when the data key is wrapped.
    pub device_public_key: Vec<u8>,
}

/// Directory status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Invited,
    Locked,
    Disabled,
}

/// A user known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub username: String,
    pub status: UserStatus,
}

impl DirectoryUser {
    /// Whether the user can receive key grants.
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// A team queued for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamDescriptor {
    pub team_uid: TeamUid,
    pub name: String,
    pub node_id: NodeId,
}

/// Users queued to join a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMembership {
    pub team_uid: TeamUid,
    pub users: Vec<UserId>,
}

/// An existing team membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamMember {
    pub team_uid: TeamUid,
    pub user_id: UserId,
}

/// A user's published public key, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPublicKey {
    pub username: String,
    pub public_key: Option<RecipientPublicKey>,
}

/// A user added to an administrative role who still lacks the role keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PendingRoleAdmin {
    pub role_id: RoleId,
    pub user_id: UserId,
}
