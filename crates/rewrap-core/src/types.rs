//! Strong identifier types.
//!
//! All identifiers are newtypes to prevent mixing a user id with a role id
//! at compile time.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Enterprise user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enterprise role identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(pub i64);

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node of the enterprise tree a team or role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

/// A 16-byte team identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamUid(pub [u8; 16]);

impl TeamUid {
    /// Generate a random team uid.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidIdentifier(e.to_string()))?;
        let arr: [u8; 16] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CoreError::InvalidIdentifier(format!("team uid of {} bytes", bytes.len())))?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for TeamUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TeamUid({})", self.to_hex())
    }
}

impl fmt::Display for TeamUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Opaque token identifying a device that awaits approval.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceToken(pub Vec<u8>);

impl DeviceToken {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceToken({self})")
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "{}", &hex[..hex.len().min(16)])
    }
}

/// Identity of a protecting key.
///
/// Resolved keys are cached under their owner, so two records with the same
/// owner always resolve to the same secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyOwner {
    /// The tenant itself (tree key, tenant private key).
    Tenant,
    /// A user's data key.
    User(UserId),
    /// A team key.
    Team(TeamUid),
    /// A role admin key.
    Role(RoleId),
}

impl fmt::Display for KeyOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOwner::Tenant => write!(f, "tenant"),
            KeyOwner::User(id) => write!(f, "user:{id}"),
            KeyOwner::Team(uid) => write!(f, "team:{uid}"),
            KeyOwner::Role(id) => write!(f, "role:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_uid_hex_roundtrip() {
        let uid = TeamUid::from_bytes([0x42; 16]);
        let recovered = TeamUid::from_hex(&uid.to_hex()).unwrap();
        assert_eq!(uid, recovered);
    }

    #[test]
    fn test_team_uid_rejects_wrong_length() {
        assert!(TeamUid::from_hex("abcd").is_err());
        assert!(TeamUid::from_hex("zz").is_err());
    }

    #[test]
    fn test_generated_team_uids_differ() {
        assert_ne!(TeamUid::generate(), TeamUid::generate());
    }

    #[test]
    fn test_device_token_display_is_truncated() {
        let token = DeviceToken(vec![0xab; 32]);
        assert_eq!(format!("{token}"), "abababababababab");

        let short = DeviceToken(vec![0x01, 0x02]);
        assert_eq!(format!("{short}"), "0102");
    }

    #[test]
    fn test_key_owner_display() {
        assert_eq!(KeyOwner::Tenant.to_string(), "tenant");
        assert_eq!(KeyOwner::User(UserId(7)).to_string(), "user:7");
        assert_eq!(KeyOwner::Role(RoleId(3)).to_string(), "role:3");
    }
}
