//! Multi-recipient secret wrapping with RSA PKCS#1 v1.5
//!
//! The locker secret is sealed for the realm key only. The main secret is
//! sealed independently for every authority key, so any single authority
//! can release it, but none can rebuild the final secret alone.

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::{traits::PublicKeyParts, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use kdsnap_core::EncryptedSecretPair;

use crate::error::{CryptoError, CryptoResult};
use crate::keyring::RecipientKey;

/// PKCS#1 v1.5 encryption padding overhead in bytes
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Encrypt a secret with an RSA public key.
pub fn encrypt_secret(key: &RsaPublicKey, secret: &[u8]) -> CryptoResult<Vec<u8>> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let max = key.size().saturating_sub(PKCS1_V15_OVERHEAD);
    if secret.len() > max {
        return Err(CryptoError::SecretTooLong {
            len: secret.len(),
            max,
        });
    }

    Ok(key.encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, secret)?)
}

/// Decrypt a secret sealed by [`encrypt_secret`].
pub fn decrypt_secret(key: &RsaPrivateKey, ciphertext: &[u8]) -> CryptoResult<Zeroizing<Vec<u8>>> {
    if ciphertext.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    Ok(Zeroizing::new(key.decrypt(Pkcs1v15Encrypt, ciphertext)?))
}

/// Seal the locker secret for the realm key.
pub fn wrap_for_realm(locker_secret: &[u8], realm_key: &RsaPublicKey) -> CryptoResult<Vec<u8>> {
    encrypt_secret(realm_key, locker_secret)
}

/// Seal the same main secret for every authority key.
///
/// Returns fingerprint → base64 ciphertext. Fails as a whole if any single
/// key fails.
pub fn wrap_for_authorities(
    main_secret: &[u8],
    authorities: &[RecipientKey],
) -> CryptoResult<EncryptedSecretPair> {
    if main_secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }
    if authorities.is_empty() {
        return Err(CryptoError::NoRecipients);
    }

    authorities
        .iter()
        .map(|auth| {
            let sealed = encrypt_secret(auth.key.rsa(), main_secret)?;
            Ok((auth.fingerprint.to_string(), STANDARD.encode(sealed)))
        })
        .collect()
}

/// Decode a base64 sealed secret and decrypt it.
pub fn unwrap_encoded_secret(
    key: &RsaPrivateKey,
    encoded: &str,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let ciphertext = STANDARD.decode(encoded)?;
    decrypt_secret(key, &ciphertext)
}
