//! Cryptographic primitives for the key hierarchy.
//!
//! Provides X25519 key agreement, ChaCha20-Poly1305 authenticated encryption,
//! and the legacy AES key wrap used for keys protected by the root data key.

use std::fmt;

use aes_kw::KekAes256;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{KeyError, Result};

/// Size of every symmetric key in the hierarchy.
pub const KEY_SIZE: usize = 32;

/// Size of a legacy AES-KW wrapped key (key + 8 byte integrity block).
pub const WRAPPED_KEY_SIZE: usize = KEY_SIZE + 8;

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret key.
#[derive(Clone)]
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = Self(StaticSecret::from(bytes));
        bytes.zeroize();
        secret
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Create from a slice, checking its length.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidKeyLength {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Self::from_bytes(arr))
    }

    /// Raw secret bytes, for sealing the key under another key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

impl fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("X25519StaticSecret")
            .field(&self.public_key())
            .finish()
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a symmetric key from this shared secret.
    ///
    /// Blake3 in key-derivation mode gives domain separation per context.
    pub fn derive_key(&self, context: &[u8]) -> SymmetricKey {
        let mut hasher = blake3::Hasher::new_derive_key("rewrap-keys-v1-seal");
        hasher.update(&self.0);
        hasher.update(context);
        SymmetricKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric key: root data key, tree key, team, role, or user data key.
///
/// The bytes are wiped when the key is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a decrypted buffer, checking its length.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(KeyError::InvalidKeyLength {
                expected: KEY_SIZE,
                got: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt data with ChaCha20-Poly1305 under this key.
    pub fn encrypt(&self, plaintext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeyError::Encryption(e.to_string()))?;

        cipher
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| KeyError::Encryption(e.to_string()))
    }

    /// Decrypt ChaCha20-Poly1305 data under this key.
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| KeyError::Decryption(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| KeyError::Decryption(e.to_string()))
    }

    /// Wrap another key with AES-256 key wrap (RFC 3394).
    ///
    /// This is the legacy form used for keys encrypted by the root data key.
    pub fn wrap_key(&self, key: &SymmetricKey) -> Result<Vec<u8>> {
        let kek = KekAes256::from(self.0);
        kek.wrap_vec(key.as_bytes())
            .map_err(|_| KeyError::Encryption("AES-KW wrap failed".into()))
    }

    /// Unwrap a key produced by [`SymmetricKey::wrap_key`].
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<SymmetricKey> {
        if wrapped.len() != WRAPPED_KEY_SIZE {
            return Err(KeyError::Malformed(format!(
                "wrapped key of {} bytes, expected {WRAPPED_KEY_SIZE}",
                wrapped.len()
            )));
        }
        let kek = KekAes256::from(self.0);
        let mut unwrapped = kek
            .unwrap_vec(wrapped)
            .map_err(|_| KeyError::Decryption("AES-KW integrity check failed".into()))?;
        let key = SymmetricKey::try_from_slice(&unwrapped);
        unwrapped.zeroize();
        key
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A 96-bit nonce for the AEAD ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; 12]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x25519_key_agreement() {
        let alice = X25519StaticSecret::generate();
        let bob = X25519StaticSecret::generate();

        let alice_shared = alice.diffie_hellman(&bob.public_key());
        let bob_shared = bob.diffie_hellman(&alice.public_key());

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let bob = X25519StaticSecret::generate();

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let sender_shared = ephemeral.diffie_hellman(&bob.public_key());

        let bob_shared = bob.diffie_hellman(&ephemeral_public);
        assert_eq!(sender_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_static_secret_bytes_roundtrip() {
        let secret = X25519StaticSecret::generate();
        let restored = X25519StaticSecret::from_bytes(secret.to_bytes());
        assert_eq!(secret.public_key(), restored.public_key());
    }

    #[test]
    fn test_chacha_wrong_key_fails() {
        let key1 = SymmetricKey::generate();
        let key2 = SymmetricKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key1.encrypt(b"secret", &nonce).unwrap();
        assert!(key2.decrypt(&ciphertext, &nonce).is_err());
        assert_eq!(key1.decrypt(&ciphertext, &nonce).unwrap(), b"secret");
    }

    #[test]
    fn test_legacy_wrap_unwrap() {
        let kek = SymmetricKey::generate();
        let key = SymmetricKey::generate();

        let wrapped = kek.wrap_key(&key).unwrap();
        assert_eq!(wrapped.len(), WRAPPED_KEY_SIZE);

        let unwrapped = kek.unwrap_key(&wrapped).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_legacy_unwrap_wrong_kek_fails() {
        let kek = SymmetricKey::generate();
        let other = SymmetricKey::generate();
        let wrapped = kek.wrap_key(&SymmetricKey::generate()).unwrap();

        assert!(matches!(
            other.unwrap_key(&wrapped),
            Err(KeyError::Decryption(_))
        ));
    }

    #[test]
    fn test_legacy_unwrap_rejects_truncated() {
        let kek = SymmetricKey::generate();
        let wrapped = kek.wrap_key(&SymmetricKey::generate()).unwrap();

        assert!(matches!(
            kek.unwrap_key(&wrapped[..20]),
            Err(KeyError::Malformed(_))
        ));
    }

    #[test]
    fn test_key_derivation_separates_contexts() {
        let shared = SharedKey([0x42; 32]);

        let a = shared.derive_key(b"context-a");
        let b = shared.derive_key(b"context-b");
        assert_ne!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes(), shared.derive_key(b"context-a").as_bytes());
    }

    #[test]
    fn test_symmetric_key_debug_is_redacted() {
        let key = SymmetricKey::from_bytes([0x11; 32]);
        assert_eq!(format!("{key:?}"), "SymmetricKey(..)");
    }
}
