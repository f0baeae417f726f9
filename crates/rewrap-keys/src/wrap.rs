//! Re-wrapping resolved keys for their new holders.

use rewrap_core::RecipientPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha2::Sha256;

use crate::crypto::{SymmetricKey, X25519PublicKey};
use crate::error::{KeyError, Result};
use crate::sealed::SealedKey;

/// Encrypt `key` under a recipient's public key.
///
/// EC recipients get a [`SealedKey`]. RSA recipients publish a DER
/// `SubjectPublicKeyInfo` and get RSA-OAEP with SHA-256 over the raw key bytes.
pub fn wrap_for_recipient(key: &SymmetricKey, recipient: &RecipientPublicKey) -> Result<Vec<u8>> {
    match recipient {
        RecipientPublicKey::Ec(bytes) => {
            let public = X25519PublicKey::from_bytes(*bytes);
            Ok(SealedKey::seal_key(key, &public)?.to_bytes())
        }
        RecipientPublicKey::Rsa(der) => {
            let public = RsaPublicKey::from_public_key_der(der)
                .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
            public
                .encrypt(&mut rand::thread_rng(), Oaep::new::<Sha256>(), key.as_bytes())
                .map_err(|e| KeyError::Encryption(e.to_string()))
        }
    }
}

/// Encrypt `key` under a device's raw public key.
pub fn wrap_for_device(key: &SymmetricKey, device_public_key: &[u8]) -> Result<Vec<u8>> {
    let recipient = RecipientPublicKey::ec_from_slice(device_public_key)?;
    wrap_for_recipient(key, &recipient)
}
