//! Session key context.
//!
//! The unlocked key material of an authenticated tenant administrator. A
//! context is built once per session by the session collaborator and handed
//! to every pass explicitly; nothing here is global.

use std::fmt;

use rewrap_core::{EncryptedKeyRecord, KeyOwner, KeyType};

use crate::crypto::{SymmetricKey, X25519PublicKey, X25519StaticSecret};
use crate::envelope::KeyEnvelope;
use crate::error::{Ancestor, KeyError, Result};
use crate::sealed::SealedKey;

/// Tenant key material as stored in the directory, before unlock.
#[derive(Debug, Clone)]
pub struct TenantKeyMaterial {
    /// The tree key, encrypted by the admin's data key or private key.
    pub tree_key: EncryptedKeyRecord,

    /// The tenant private key, in a tree-key envelope. `None` when the
    /// tenant never generated a key pair.
    pub encrypted_private_key: Option<Vec<u8>>,
}

/// Ancestor keys available to a pass.
pub struct SessionKeyContext {
    data_key: SymmetricKey,
    tree_key: SymmetricKey,
    private_key: Option<X25519StaticSecret>,
}

impl SessionKeyContext {
    /// Build a context from already unlocked keys.
    pub fn new(
        data_key: SymmetricKey,
        tree_key: SymmetricKey,
        private_key: Option<X25519StaticSecret>,
    ) -> Self {
        Self {
            data_key,
            tree_key,
            private_key,
        }
    }

    /// Unlock the tenant key material with the administrator's own keys.
    ///
    /// The tree key is decrypted by its discriminant: the admin's data key for
    /// [`KeyType::EncryptedByDataKey`], the admin's private key for
    /// [`KeyType::EncryptedByPublicKey`]. The tenant private key is then
    /// opened from its tree-key envelope.
    pub fn unlock(
        material: &TenantKeyMaterial,
        data_key: SymmetricKey,
        user_private_key: Option<&X25519StaticSecret>,
    ) -> Result<Self> {
        let record = &material.tree_key;
        let tree_key = match record.key_type()? {
            KeyType::EncryptedByDataKey => data_key.unwrap_key(&record.ciphertext)?,
            KeyType::EncryptedByPublicKey => {
                let secret = user_private_key.ok_or(KeyError::MissingAncestor(Ancestor::PrivateKey))?;
                SealedKey::from_bytes(&record.ciphertext)?.open_key(secret)?
            }
            KeyType::EncryptedByTreeKey => {
                return Err(KeyError::MissingAncestor(Ancestor::TreeKey));
            }
        };

        let private_key = match &material.encrypted_private_key {
            Some(bytes) => {
                let plaintext = KeyEnvelope::from_bytes(bytes)?.open(&tree_key)?;
                Some(X25519StaticSecret::try_from_slice(&plaintext)?)
            }
            None => None,
        };

        tracing::debug!(
            has_private_key = private_key.is_some(),
            "unlocked tenant key material"
        );

        Ok(Self::new(data_key, tree_key, private_key))
    }

    /// The root data key.
    pub fn data_key(&self) -> &SymmetricKey {
        &self.data_key
    }

    /// The tenant tree key.
    pub fn tree_key(&self) -> &SymmetricKey {
        &self.tree_key
    }

    /// The tenant private key, if the tenant has a key pair.
    pub fn private_key(&self) -> Option<&X25519StaticSecret> {
        self.private_key.as_ref()
    }

    /// The tenant public key, if the tenant has a key pair.
    pub fn public_key(&self) -> Option<X25519PublicKey> {
        self.private_key.as_ref().map(X25519StaticSecret::public_key)
    }

    /// Encrypt `key` so that it resolves through the named ancestor.
    ///
    /// The inverse of [`crate::KeyResolver::resolve`].
    pub fn protect(
        &self,
        owner: KeyOwner,
        key: &SymmetricKey,
        key_type: KeyType,
    ) -> Result<EncryptedKeyRecord> {
        let ciphertext = match key_type {
            KeyType::EncryptedByDataKey => self.data_key.wrap_key(key)?,
            KeyType::EncryptedByPublicKey => {
                let public = self
                    .public_key()
                    .ok_or(KeyError::MissingAncestor(Ancestor::PrivateKey))?;
                SealedKey::seal_key(key, &public)?.to_bytes()
            }
            KeyType::EncryptedByTreeKey => KeyEnvelope::seal_key(key, &self.tree_key)?.to_bytes(),
        };
        Ok(EncryptedKeyRecord::new(owner, ciphertext, key_type))
    }
}

impl fmt::Debug for SessionKeyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyContext")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
