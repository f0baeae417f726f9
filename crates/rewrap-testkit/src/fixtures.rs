//! Test fixtures and helpers.
//!
//! A [`TenantFixture`] owns a freshly generated tenant key hierarchy and a
//! `MemoryDirectory` populated through it, so every record a pass fetches
//! decrypts exactly the way a real tenant's would.

use std::sync::Arc;

use rewrap_core::{
    DeviceApprovalRequest, DeviceToken, DirectoryUser, EncryptedKeyRecord, KeyOwner, KeyType,
    NodeId, PendingRoleAdmin, RecipientPublicKey, RoleId, TeamDescriptor, TeamUid, UserId,
    UserStatus,
};
use rewrap_directory::MemoryDirectory;
use rewrap_keys::{
    KeyEnvelope, SealedKey, SessionKeyContext, SymmetricKey, TenantKeyMaterial,
    X25519StaticSecret,
};
use rsa::pkcs8::EncodePublicKey;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;

/// A user created by the fixture, with the secrets only the user would hold.
pub struct UserHandle {
    pub id: UserId,
    pub username: String,
    pub secret: X25519StaticSecret,
    pub data_key: SymmetricKey,
}

impl UserHandle {
    /// Open a key that was sealed to this user's public key.
    pub fn open(&self, sealed: &[u8]) -> SymmetricKey {
        SealedKey::from_bytes(sealed)
            .and_then(|s| s.open_key(&self.secret))
            .expect("key was not sealed to this user")
    }
}

/// A user who publishes an RSA public key.
pub struct RsaUserHandle {
    pub id: UserId,
    pub username: String,
    pub private: RsaPrivateKey,
}

impl RsaUserHandle {
    /// Open a key that was RSA-OAEP encrypted to this user.
    pub fn open(&self, wrapped: &[u8]) -> SymmetricKey {
        let bytes = self
            .private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .expect("key was not wrapped for this user");
        SymmetricKey::try_from_slice(&bytes).expect("wrapped key has the wrong length")
    }
}

/// A device awaiting approval, with its private key.
pub struct DeviceHandle {
    pub user_id: UserId,
    pub token: DeviceToken,
    pub secret: X25519StaticSecret,
}

impl DeviceHandle {
    /// Open a data key that was sealed to this device.
    pub fn open(&self, sealed: &[u8]) -> SymmetricKey {
        SealedKey::from_bytes(sealed)
            .and_then(|s| s.open_key(&self.secret))
            .expect("key was not sealed to this device")
    }
}

/// A tenant with its key hierarchy and an in-memory directory.
pub struct TenantFixture {
    pub directory: Arc<MemoryDirectory>,
    material: TenantKeyMaterial,
    admin_data_key: SymmetricKey,
    keys: SessionKeyContext,
}

impl TenantFixture {
    /// A tenant with a root data key, a tree key, and a key pair.
    pub fn new() -> Self {
        Self::build(Some(X25519StaticSecret::generate()))
    }

    /// A tenant that never generated a key pair.
    pub fn without_private_key() -> Self {
        Self::build(None)
    }

    fn build(tenant_secret: Option<X25519StaticSecret>) -> Self {
        let admin_data_key = SymmetricKey::generate();
        let tree_key = SymmetricKey::generate();

        let material = TenantKeyMaterial {
            tree_key: EncryptedKeyRecord::new(
                KeyOwner::Tenant,
                admin_data_key.wrap_key(&tree_key).expect("wrap tree key"),
                KeyType::EncryptedByDataKey,
            ),
            encrypted_private_key: tenant_secret.as_ref().map(|secret| {
                KeyEnvelope::seal(&secret.to_bytes(), &tree_key)
                    .expect("seal tenant private key")
                    .to_bytes()
            }),
        };

        Self {
            directory: Arc::new(MemoryDirectory::new()),
            keys: SessionKeyContext::new(admin_data_key.clone(), tree_key, tenant_secret),
            material,
            admin_data_key,
        }
    }

    /// A fresh session unlocked from the stored tenant material.
    pub fn session(&self) -> SessionKeyContext {
        SessionKeyContext::unlock(&self.material, self.admin_data_key.clone(), None)
            .expect("fixture material unlocks")
    }

    /// The fixture's own copy of the tenant keys.
    pub fn keys(&self) -> &SessionKeyContext {
        &self.keys
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users and devices
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an active user with an EC public key and a wrapped data key.
    pub fn add_user(&self, id: i64) -> UserHandle {
        self.add_user_with(id, UserStatus::Active, true)
    }

    /// Add a user with the given status, optionally publishing a public key.
    pub fn add_user_with(&self, id: i64, status: UserStatus, publish_key: bool) -> UserHandle {
        let handle = UserHandle {
            id: UserId(id),
            username: username(id),
            secret: X25519StaticSecret::generate(),
            data_key: SymmetricKey::generate(),
        };

        let public_key = publish_key
            .then(|| RecipientPublicKey::Ec(*handle.secret.public_key().as_bytes()));
        self.directory.add_user(
            DirectoryUser {
                id: handle.id,
                username: handle.username.clone(),
                status,
            },
            public_key,
        );

        let key_type = if self.keys.private_key().is_some() {
            KeyType::EncryptedByPublicKey
        } else {
            KeyType::EncryptedByDataKey
        };
        let record = self
            .keys
            .protect(KeyOwner::User(handle.id), &handle.data_key, key_type)
            .expect("protect user data key");
        self.directory.set_data_key(record);

        handle
    }

    /// Add an active user who publishes an RSA public key.
    ///
    /// The key is 1024 bits to keep test key generation fast.
    pub fn add_rsa_user(&self, id: i64) -> RsaUserHandle {
        let handle = RsaUserHandle {
            id: UserId(id),
            username: username(id),
            private: RsaPrivateKey::new(&mut rand::thread_rng(), 1024)
                .expect("generate rsa key"),
        };
        let der = handle
            .private
            .to_public_key()
            .to_public_key_der()
            .expect("encode rsa public key");
        self.publish_key(id, RecipientPublicKey::Rsa(der.as_bytes().to_vec()));
        handle
    }

    /// Add an active user whose published key is `public_key`, as given.
    pub fn publish_key(&self, id: i64, public_key: RecipientPublicKey) {
        self.directory.add_user(
            DirectoryUser {
                id: UserId(id),
                username: username(id),
                status: UserStatus::Active,
            },
            Some(public_key),
        );
    }

    /// Replace a user's data key with bytes that do not decrypt.
    pub fn corrupt_data_key(&self, user_id: UserId) {
        self.directory.set_data_key(EncryptedKeyRecord::new(
            KeyOwner::User(user_id),
            vec![0x5a; 48],
            KeyType::EncryptedByPublicKey,
        ));
    }

    /// Queue a new device of `user_id` for approval.
    pub fn add_device(&self, user_id: UserId) -> DeviceHandle {
        let handle = DeviceHandle {
            user_id,
            token: DeviceToken(rand::random::<[u8; 16]>().to_vec()),
            secret: X25519StaticSecret::generate(),
        };
        self.directory.add_device_request(DeviceApprovalRequest {
            user_id,
            device_token: handle.token.clone(),
            device_public_key: handle.secret.public_key().as_bytes().to_vec(),
        });
        handle
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Teams and roles
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a team for creation.
    pub fn queue_team(&self, name: &str) -> TeamDescriptor {
        let team = TeamDescriptor {
            team_uid: TeamUid::generate(),
            name: name.to_string(),
            node_id: NodeId(1),
        };
        self.directory.queue_team(team.clone());
        team
    }

    /// Add an existing team whose key is protected in the given form.
    pub fn add_team(&self, key_type: KeyType) -> (TeamUid, SymmetricKey) {
        let team_uid = TeamUid::generate();
        let key = SymmetricKey::generate();
        let record = self
            .keys
            .protect(KeyOwner::Team(team_uid), &key, key_type)
            .expect("protect team key");
        self.directory.add_team(team_uid, vec![record]);
        (team_uid, key)
    }

    /// Queue `user_id` to join `team_uid`.
    pub fn queue_membership(&self, team_uid: TeamUid, user_id: UserId) {
        self.directory.queue_membership(team_uid, user_id);
    }

    /// Add a role, with a key protected in the given form or no key at all.
    pub fn add_role(&self, id: i64, key_type: Option<KeyType>) -> (RoleId, Option<SymmetricKey>) {
        let role_id = RoleId(id);
        let key = key_type.map(|kt| {
            let key = SymmetricKey::generate();
            let record = self
                .keys
                .protect(KeyOwner::Role(role_id), &key, kt)
                .expect("protect role key");
            self.directory.add_role_key(role_id, record);
            key
        });
        (role_id, key)
    }

    /// Queue `user_id` as an administrator of `role_id`.
    pub fn queue_role_admin(&self, role_id: RoleId, user_id: UserId) {
        self.directory
            .queue_role_admin(PendingRoleAdmin { role_id, user_id });
    }
}

impl Default for TenantFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Username the fixture assigns to user `id`.
pub fn username(id: i64) -> String {
    format!("user{id}@example.com")
}
