//! Shared RSA fixtures for unit tests

use std::sync::OnceLock;

use rsa::{RsaPrivateKey, RsaPublicKey};
use ssh_key::public::{Ed25519PublicKey, KeyData};

/// Small keys keep test runs fast; PKCS#1 v1.5 still fits 16-byte secrets easily.
pub const TEST_KEY_BITS: usize = 1024;

/// Four RSA keys generated once per test binary.
pub fn rsa_keys() -> &'static [RsaPrivateKey] {
    static KEYS: OnceLock<Vec<RsaPrivateKey>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (0..4)
            .map(|_| RsaPrivateKey::new(&mut rng, TEST_KEY_BITS).expect("generate RSA key"))
            .collect()
    })
}

/// A 512-bit key, too small to wrap anything longer than 53 bytes
pub fn small_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        RsaPrivateKey::new(&mut rand::thread_rng(), 512).expect("generate RSA key")
    })
}

/// authorized_keys line for an RSA public key
pub fn rsa_authorized_line(key: &RsaPublicKey, comment: &str) -> String {
    let data = KeyData::Rsa(ssh_key::public::RsaPublicKey::try_from(key).expect("ssh rsa key"));
    ssh_key::PublicKey::new(data, comment)
        .to_openssh()
        .expect("encode openssh key")
}

/// authorized_keys line for an arbitrary Ed25519 public key
pub fn ed25519_authorized_line(seed: u8, comment: &str) -> String {
    let data = KeyData::Ed25519(Ed25519PublicKey([seed; 32]));
    ssh_key::PublicKey::new(data, comment)
        .to_openssh()
        .expect("encode openssh key")
}

/// Fingerprint text of an RSA public key: SHA-256 over the SSH wire blob,
/// computed here without going through the key ring
pub fn rsa_fingerprint(key: &RsaPublicKey) -> String {
    use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
    use sha2::{Digest, Sha256};

    let data = KeyData::Rsa(ssh_key::public::RsaPublicKey::try_from(key).expect("ssh rsa key"));
    let blob = ssh_key::PublicKey::new(data, "").to_bytes().expect("encode key blob");
    format!("SHA256:{}", STANDARD_NO_PAD.encode(Sha256::digest(&blob)))
}
