//! Pending grants and pass scope.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{DeviceToken, KeyOwner, RoleId, TeamUid, UserId};

/// An entity waiting for a key to be re-wrapped for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PendingGrant {
    /// A device awaiting login approval; receives its user's data key.
    Device { user_id: UserId, device: DeviceToken },

    /// A user awaiting team membership; receives the team key.
    TeamMembership { team_uid: TeamUid, user_id: UserId },

    /// A role administrator; receives the tree key and the role key.
    RoleAdmin { role_id: RoleId, user_id: UserId },
}

impl PendingGrant {
    /// The user who ends up holding the key.
    pub fn user_id(&self) -> UserId {
        match self {
            PendingGrant::Device { user_id, .. }
            | PendingGrant::TeamMembership { user_id, .. }
            | PendingGrant::RoleAdmin { user_id, .. } => *user_id,
        }
    }

    /// Owner of the key that is re-wrapped for the recipient.
    pub fn protecting_key(&self) -> KeyOwner {
        match self {
            PendingGrant::Device { user_id, .. } => KeyOwner::User(*user_id),
            PendingGrant::TeamMembership { team_uid, .. } => KeyOwner::Team(*team_uid),
            PendingGrant::RoleAdmin { role_id, .. } => KeyOwner::Role(*role_id),
        }
    }
}

impl fmt::Display for PendingGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingGrant::Device { user_id, device } => {
                write!(f, "device {device} of user {user_id}")
            }
            PendingGrant::TeamMembership { team_uid, user_id } => {
                write!(f, "user {user_id} into team {team_uid}")
            }
            PendingGrant::RoleAdmin { role_id, user_id } => {
                write!(f, "user {user_id} as admin of role {role_id}")
            }
        }
    }
}

/// Which reconcilers a pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Devices,
    Teams,
    Both,
}

impl Scope {
    pub fn includes_devices(self) -> bool {
        matches!(self, Scope::Devices | Scope::Both)
    }

    pub fn includes_teams(self) -> bool {
        matches!(self, Scope::Teams | Scope::Both)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Devices => write!(f, "devices"),
            Scope::Teams => write!(f, "teams"),
            Scope::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protecting_key_by_variant() {
        let device = PendingGrant::Device {
            user_id: UserId(5),
            device: DeviceToken(vec![1]),
        };
        assert_eq!(device.protecting_key(), KeyOwner::User(UserId(5)));

        let team = TeamUid::from_bytes([7; 16]);
        let member = PendingGrant::TeamMembership {
            team_uid: team,
            user_id: UserId(9),
        };
        assert_eq!(member.protecting_key(), KeyOwner::Team(team));
        assert_eq!(member.user_id(), UserId(9));

        let admin = PendingGrant::RoleAdmin {
            role_id: RoleId(2),
            user_id: UserId(3),
        };
        assert_eq!(admin.protecting_key(), KeyOwner::Role(RoleId(2)));
    }

    #[test]
    fn test_scope_membership() {
        assert!(Scope::Both.includes_devices() && Scope::Both.includes_teams());
        assert!(Scope::Devices.includes_devices() && !Scope::Devices.includes_teams());
        assert!(!Scope::Teams.includes_devices() && Scope::Teams.includes_teams());
    }

    #[test]
    fn test_grant_serializes() {
        let grant = PendingGrant::RoleAdmin {
            role_id: RoleId(2),
            user_id: UserId(3),
        };
        let json = serde_json::to_string(&grant).unwrap();
        let back: PendingGrant = serde_json::from_str(&json).unwrap();
        assert_eq!(grant, back);
    }
}
