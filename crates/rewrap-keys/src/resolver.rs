//! Key resolver.
//!
//! Turns an encrypted key record into key bytes by dispatching on the
//! record's discriminant to the one ancestor key and cipher it names, and
//! memoizes the result under the record's owner for the rest of the pass.

use std::collections::HashMap;

use rewrap_core::{EncryptedKeyRecord, KeyOwner, KeyType};

use crate::crypto::SymmetricKey;
use crate::envelope::KeyEnvelope;
use crate::error::{Ancestor, KeyError, Result};
use crate::sealed::SealedKey;
use crate::session::SessionKeyContext;

/// Per-pass key resolver.
///
/// Borrows the session for the duration of one pass. The cache is wiped when
/// the resolver is dropped, so resolved keys never outlive the pass.
pub struct KeyResolver<'s> {
    session: &'s SessionKeyContext,
    cache: HashMap<KeyOwner, SymmetricKey>,
    decryptions: usize,
}

impl<'s> KeyResolver<'s> {
    /// Create a resolver with an empty cache.
    pub fn new(session: &'s SessionKeyContext) -> Self {
        Self {
            session,
            cache: HashMap::new(),
            decryptions: 0,
        }
    }

    /// The session this resolver decrypts with.
    pub fn session(&self) -> &'s SessionKeyContext {
        self.session
    }

    /// Resolve a record, serving repeats for the same owner from the cache.
    pub fn resolve(&mut self, record: &EncryptedKeyRecord) -> Result<SymmetricKey> {
        if let Some(key) = self.cache.get(&record.owner) {
            return Ok(key.clone());
        }
        let key = self.decrypt(record)?;
        self.cache.insert(record.owner, key.clone());
        Ok(key)
    }

    /// Resolve `owner` from the first of its records that decrypts.
    ///
    /// Records for other owners are ignored. When every candidate fails the
    /// last failure is returned; when there are none, [`KeyError::NoRecord`].
    pub fn resolve_first<'r, I>(&mut self, owner: KeyOwner, records: I) -> Result<SymmetricKey>
    where
        I: IntoIterator<Item = &'r EncryptedKeyRecord>,
    {
        if let Some(key) = self.cache.get(&owner) {
            return Ok(key.clone());
        }

        let mut last_error = None;
        for record in records.into_iter().filter(|r| r.owner == owner) {
            match self.decrypt(record) {
                Ok(key) => {
                    self.cache.insert(owner, key.clone());
                    return Ok(key);
                }
                Err(e) => {
                    tracing::debug!(%owner, key_type = record.key_type, error = %e, "candidate key did not decrypt");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(KeyError::NoRecord(owner)))
    }

    /// Record a key obtained without decryption (e.g. one just generated).
    pub fn seed(&mut self, owner: KeyOwner, key: SymmetricKey) {
        self.cache.insert(owner, key);
    }

    /// Look up a key resolved earlier in this pass.
    pub fn cached(&self, owner: &KeyOwner) -> Option<&SymmetricKey> {
        self.cache.get(owner)
    }

    /// Number of decrypt operations performed so far.
    pub fn decryptions(&self) -> usize {
        self.decryptions
    }

    /// Drop every cached key.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn decrypt(&mut self, record: &EncryptedKeyRecord) -> Result<SymmetricKey> {
        let key_type = KeyType::try_from(record.key_type)?;
        self.decryptions += 1;

        match key_type {
            KeyType::EncryptedByDataKey => self.session.data_key().unwrap_key(&record.ciphertext),
            KeyType::EncryptedByPublicKey => {
                let secret = self
                    .session
                    .private_key()
                    .ok_or(KeyError::MissingAncestor(Ancestor::PrivateKey))?;
                SealedKey::from_bytes(&record.ciphertext)?.open_key(secret)
            }
            KeyType::EncryptedByTreeKey => {
                KeyEnvelope::from_bytes(&record.ciphertext)?.open_key(self.session.tree_key())
            }
        }
    }
}
