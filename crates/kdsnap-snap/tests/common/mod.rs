//! Key fixtures shared by the snapshot integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use rsa::RsaPrivateKey;
use secrecy::SecretSlice;
use ssh_key::public::KeyData;
use time::OffsetDateTime;

use kdsnap_core::{MAX_KEYS_FILE_SIZE, PSK_SIZE};
use kdsnap_crypto::{find_realm_key, load_authority_keys, Fingerprint, SecretLayout};
use kdsnap_snap::SnapOpts;

pub const BRIGADE_ID: &str = "b1";
pub const TAG: &str = "2024-snap";

/// realm key, then three authority keys
pub fn keys() -> &'static [RsaPrivateKey] {
    static KEYS: OnceLock<Vec<RsaPrivateKey>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (0..4)
            .map(|_| RsaPrivateKey::new(&mut rng, 1024).expect("generate RSA key"))
            .collect()
    })
}

pub fn realm_key() -> &'static RsaPrivateKey {
    &keys()[0]
}

pub fn authority_keys() -> &'static [RsaPrivateKey] {
    &keys()[1..]
}

fn authorized_line(key: &RsaPrivateKey, comment: &str) -> String {
    let public = ssh_key::public::RsaPublicKey::try_from(&key.to_public_key()).expect("ssh rsa key");
    ssh_key::PublicKey::new(KeyData::Rsa(public), comment)
        .to_openssh()
        .expect("encode openssh key")
}

/// Key files as the key desk host keeps them
pub struct KeyDir {
    pub dir: tempfile::TempDir,
}

impl KeyDir {
    /// One realm key and the first `authorities` authority keys
    pub fn new(authorities: usize) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");

        let realms = format!("{}\n", authorized_line(realm_key(), "realm"));
        std::fs::write(dir.path().join("realms_keys"), realms).expect("write realms_keys");

        let auths: String = authority_keys()[..authorities]
            .iter()
            .enumerate()
            .map(|(i, key)| format!("{}\n", authorized_line(key, &format!("authority-{i}"))))
            .collect();
        std::fs::write(dir.path().join("authorities_keys"), auths).expect("write authorities_keys");

        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

pub fn realm_fingerprint() -> Fingerprint {
    Fingerprint::of_rsa(&realm_key().to_public_key()).expect("fingerprint")
}

pub fn snap_opts(keys: &KeyDir, brigade_id: &str, psk: [u8; PSK_SIZE], layout: SecretLayout) -> SnapOpts {
    snap_opts_in(keys.dir.path(), brigade_id, psk, layout)
}

fn snap_opts_in(dir: &Path, brigade_id: &str, psk: [u8; PSK_SIZE], layout: SecretLayout) -> SnapOpts {
    let realm_fp = realm_fingerprint();
    let realm_key = find_realm_key(&dir.join("realms_keys"), &realm_fp, MAX_KEYS_FILE_SIZE)
        .expect("realm key");
    let authorities =
        load_authority_keys(&dir.join("authorities_keys"), MAX_KEYS_FILE_SIZE).expect("authorities");

    SnapOpts {
        tag: TAG.to_string(),
        brigade_id: brigade_id.to_string(),
        global_snap_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("timestamp"),
        psk: SecretSlice::from(psk.to_vec()),
        realm_fp,
        realm_key,
        authorities,
        layout,
    }
}

/// A small brigade storage document
pub fn storage(brigade_id: &str) -> Vec<u8> {
    let users: Vec<String> = (0..50)
        .map(|i| format!(r#"{{"user_id":"u{i}","name":"user {i}","quota":{}}}"#, i * 1024))
        .collect();
    format!(
        "{{\n  \"brigade_id\": \"{brigade_id}\",\n  \"endpoint_ipv4\": \"203.0.113.7\",\n  \"users\": [{}]\n}}\n",
        users.join(",")
    )
    .into_bytes()
}
