use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::KdsnapResult;

/// Encrypted main secrets keyed by authority key fingerprint.
///
/// Every value is the base64 RSA ciphertext of the same main secret.
pub type EncryptedSecretPair = BTreeMap<String, String>;

/// A sealed snapshot of a brigade storage.
///
/// Payload recovery needs the locker secret (realm private key) and the main
/// secret (any one authority private key) together with the PSK, which is
/// never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBrigade {
    /// Identification tag of the whole snapshot run,
    /// e.g. `2023-01-01T00:00:00Z-regular-quarter-snapshot`
    pub tag: String,

    /// Start of the global snapshot run
    #[serde(with = "time::serde::rfc3339")]
    pub global_snap_at: OffsetDateTime,

    pub brigade_id: String,

    /// gzip + OpenSSL salted AES-256-CBC ciphertext (base64)
    pub payload: String,

    /// Moment this brigade was sealed
    #[serde(with = "time::serde::rfc3339")]
    pub local_snap_at: OffsetDateTime,

    /// Fingerprint of the realm public key the locker secret is sealed for
    pub realm_key_fp: String,

    /// Locker secret sealed with the realm public key (base64)
    pub encrypted_locker_secret: String,

    /// Main secret sealed once per authority key
    #[serde(rename = "sss_keys")]
    pub secrets: EncryptedSecretPair,
}

impl EncryptedBrigade {
    /// Serialize as 2-space indented JSON
    pub fn to_json_pretty(&self) -> KdsnapResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> KdsnapResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}
