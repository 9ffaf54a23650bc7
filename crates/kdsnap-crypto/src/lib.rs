//! kdsnap-crypto: escrow crypto for brigade snapshots
//!
//! Two-layer escrow: the payload passphrase ("final secret") mixes a locker
//! secret and a main secret with snapshot context and a pre-shared key.
//! ```text
//! final secret = tag ‖ brigade id ‖ global snap time ‖ local snap time ‖ PSK ‖ locker ‖ main
//!   ├── locker secret (16 B random) ── RSA PKCS#1 v1.5 ──> realm key
//!   └── main secret   (16 B random) ── RSA PKCS#1 v1.5 ──> every authority key
//! payload = OpenSSL "Salted__" AES-256-CBC, PBKDF2-HMAC-SHA256 (10000 rounds) over gzip(storage)
//! ```
//! Recovery needs the realm private key AND any one authority private key.

pub mod error;
pub mod keyring;
pub mod openssl;
pub mod pkcs7;
pub mod secret;
pub mod wrap;

#[cfg(test)]
pub(crate) mod test_keys;

pub use error::{CryptoError, CryptoResult};
pub use keyring::{
    find_realm_key, load_authority_keys, load_private_key, Fingerprint, RecipientAlgorithm,
    RecipientKey,
};
pub use openssl::{decrypt_aes256_cbc, encrypt_aes256_cbc};
pub use secret::{derive_secrets, final_secret, FinalSecretInput, SecretsPack};
pub use wrap::{
    decrypt_secret, encrypt_secret, unwrap_encoded_secret, wrap_for_authorities, wrap_for_realm,
};

pub use kdsnap_core::config::SecretLayout;
