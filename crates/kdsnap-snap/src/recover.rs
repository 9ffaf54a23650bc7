//! Snapshot recovery: unwrap both escrow secrets and open the payload

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::RsaPrivateKey;

use kdsnap_core::EncryptedBrigade;
use kdsnap_crypto::{final_secret, unwrap_encoded_secret, Fingerprint, FinalSecretInput, SecretLayout};

use crate::compress::decrypt_decompress_snapshot;
use crate::error::{SnapError, SnapResult};

/// Private keys for one recovery: the realm key and any one authority key
pub struct RecoveryKeys {
    pub realm: RsaPrivateKey,
    pub authority: (Fingerprint, RsaPrivateKey),
}

impl RecoveryKeys {
    /// Pair the keys, fingerprinting the authority key from its public half.
    pub fn new(realm: RsaPrivateKey, authority: RsaPrivateKey) -> SnapResult<Self> {
        let fingerprint = Fingerprint::of_rsa(&authority.to_public_key())?;
        Ok(Self {
            realm,
            authority: (fingerprint, authority),
        })
    }
}

/// Recover the original storage bytes from an envelope.
///
/// `psk` and `layout` must be the ones used when sealing.
pub fn recover_snapshot(
    envelope: &EncryptedBrigade,
    keys: &RecoveryKeys,
    psk: &[u8],
    layout: SecretLayout,
) -> SnapResult<Vec<u8>> {
    let realm_fp = Fingerprint::of_rsa(&keys.realm.to_public_key())?;
    if realm_fp.as_str() != envelope.realm_key_fp {
        return Err(SnapError::RealmKeyMismatch {
            expected: envelope.realm_key_fp.clone(),
            found: realm_fp.to_string(),
        });
    }

    let (authority_fp, authority_key) = &keys.authority;
    let sealed_main = envelope
        .secrets
        .get(authority_fp.as_str())
        .ok_or_else(|| SnapError::AuthorityNotInEnvelope(authority_fp.to_string()))?;

    let locker_secret = unwrap_encoded_secret(&keys.realm, &envelope.encrypted_locker_secret)?;
    let main_secret = unwrap_encoded_secret(authority_key, sealed_main)?;

    let secret = final_secret(
        layout,
        &FinalSecretInput {
            tag: &envelope.tag,
            brigade_id: &envelope.brigade_id,
            global_snap_at: envelope.global_snap_at.unix_timestamp(),
            local_snap_at: envelope.local_snap_at.unix_timestamp(),
            psk,
            locker_secret: &locker_secret,
            main_secret: &main_secret,
        },
    );

    let payload = STANDARD.decode(&envelope.payload)?;
    let storage = decrypt_decompress_snapshot(payload.as_slice(), &secret)?;

    tracing::info!(
        brigade_id = %envelope.brigade_id,
        tag = %envelope.tag,
        authority = %authority_fp,
        bytes = storage.len(),
        "snapshot recovered"
    );
    Ok(storage)
}
