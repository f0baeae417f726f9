//! Keys sealed to an X25519 public key.
//!
//! A sealed key is how a secret reaches a specific holder: the tenant's data
//! keys for its users, a user's data key for a new device, a team key for a
//! new member. The sender generates an ephemeral key pair, derives a wrap key
//! from the ECDH shared secret, and encrypts the secret with ChaCha20-Poly1305.

use serde::{Deserialize, Serialize};

use crate::crypto::{
    EncryptionNonce, EphemeralKeyPair, SymmetricKey, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{KeyError, Result};

/// A secret encrypted for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKey {
    /// Ephemeral X25519 public key (sender's side of ECDH).
    pub ephemeral_public: X25519PublicKey,

    /// Nonce used for encryption.
    pub nonce: EncryptionNonce,

    /// The secret, encrypted with the derived wrap key.
    pub ciphertext: Vec<u8>,
}

impl SealedKey {
    /// Seal a secret for a recipient.
    ///
    /// Every call uses a fresh ephemeral key and nonce, so sealing the same
    /// secret for two recipients never yields related ciphertexts.
    pub fn seal(secret: &[u8], recipient: &X25519PublicKey) -> Result<Self> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let shared = ephemeral.diffie_hellman(recipient);

        let wrap_key = shared.derive_key(&context(&ephemeral_public, recipient));
        let nonce = EncryptionNonce::generate();
        let ciphertext = wrap_key.encrypt(secret, &nonce)?;

        Ok(Self {
            ephemeral_public,
            nonce,
            ciphertext,
        })
    }

    /// Seal a symmetric key for a recipient.
    pub fn seal_key(key: &SymmetricKey, recipient: &X25519PublicKey) -> Result<Self> {
        Self::seal(key.as_bytes(), recipient)
    }

    /// Decrypt the secret using the recipient's secret key.
    pub fn open(&self, recipient_secret: &X25519StaticSecret) -> Result<Vec<u8>> {
        let shared = recipient_secret.diffie_hellman(&self.ephemeral_public);
        let wrap_key = shared.derive_key(&context(
            &self.ephemeral_public,
            &recipient_secret.public_key(),
        ));
        wrap_key.decrypt(&self.ciphertext, &self.nonce)
    }

    /// Decrypt a sealed symmetric key.
    pub fn open_key(&self, recipient_secret: &X25519StaticSecret) -> Result<SymmetricKey> {
        let plaintext = self.open(recipient_secret)?;
        SymmetricKey::try_from_slice(&plaintext)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).expect("CBOR serialization failed");
        buf
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| KeyError::Malformed(e.to_string()))
    }
}

/// Binds the wrap key to both ends of the exchange.
fn context(ephemeral: &X25519PublicKey, recipient: &X25519PublicKey) -> [u8; 64] {
    let mut ctx = [0u8; 64];
    ctx[..32].copy_from_slice(ephemeral.as_bytes());
    ctx[32..].copy_from_slice(recipient.as_bytes());
    ctx
}
