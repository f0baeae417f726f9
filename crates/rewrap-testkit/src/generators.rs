//! Proptest generators for property-based testing.

use proptest::prelude::*;

use rewrap_core::{
    DeviceToken, EncryptedKeyRecord, KeyOwner, PendingGrant, RoleId, TeamUid, UserId,
};

/// Generate a UserId.
pub fn user_id() -> impl Strategy<Value = UserId> {
    (1i64..=1_000_000).prop_map(UserId)
}

/// Generate a RoleId.
pub fn role_id() -> impl Strategy<Value = RoleId> {
    (1i64..=10_000).prop_map(RoleId)
}

/// Generate a TeamUid.
pub fn team_uid() -> impl Strategy<Value = TeamUid> {
    any::<[u8; 16]>().prop_map(TeamUid::from_bytes)
}

/// Generate a device token of realistic length.
pub fn device_token() -> impl Strategy<Value = DeviceToken> {
    prop::collection::vec(any::<u8>(), 8..=32).prop_map(DeviceToken)
}

/// Generate the owner of a protecting key.
pub fn key_owner() -> impl Strategy<Value = KeyOwner> {
    prop_oneof![
        Just(KeyOwner::Tenant),
        user_id().prop_map(KeyOwner::User),
        team_uid().prop_map(KeyOwner::Team),
        role_id().prop_map(KeyOwner::Role),
    ]
}

/// Generate a raw discriminant, biased toward the known forms.
pub fn raw_key_type() -> impl Strategy<Value = u32> {
    prop_oneof![
        3 => 1u32..=3,
        1 => any::<u32>(),
    ]
}

/// Generate a record whose ciphertext is arbitrary bytes.
pub fn garbage_record() -> impl Strategy<Value = EncryptedKeyRecord> {
    (
        key_owner(),
        prop::collection::vec(any::<u8>(), 0..=128),
        raw_key_type(),
    )
        .prop_map(|(owner, ciphertext, key_type)| EncryptedKeyRecord {
            owner,
            ciphertext,
            key_type,
        })
}

/// Generate a pending grant of any kind.
pub fn pending_grant() -> impl Strategy<Value = PendingGrant> {
    prop_oneof![
        (user_id(), device_token())
            .prop_map(|(user_id, device)| PendingGrant::Device { user_id, device }),
        (team_uid(), user_id())
            .prop_map(|(team_uid, user_id)| PendingGrant::TeamMembership { team_uid, user_id }),
        (role_id(), user_id())
            .prop_map(|(role_id, user_id)| PendingGrant::RoleAdmin { role_id, user_id }),
    ]
}

/// Generate an operation count and a page size for paging properties.
pub fn page_plan() -> impl Strategy<Value = (usize, usize)> {
    (0usize..=250, 1usize..=60)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_grant_protecting_key_matches_kind(grant in pending_grant()) {
            let owner = grant.protecting_key();
            match grant {
                PendingGrant::Device { user_id, .. } => prop_assert_eq!(owner, KeyOwner::User(user_id)),
                PendingGrant::TeamMembership { team_uid, .. } => prop_assert_eq!(owner, KeyOwner::Team(team_uid)),
                PendingGrant::RoleAdmin { role_id, .. } => prop_assert_eq!(owner, KeyOwner::Role(role_id)),
            }
        }
    }
}
