//! Escrow secret generation and final secret assembly

use std::fmt;
use std::io::Write;

use rand::RngCore;
use time::OffsetDateTime;
use zeroize::Zeroizing;

use kdsnap_core::config::SecretLayout;

use crate::error::{CryptoError, CryptoResult};

/// Locker secret size in bytes (sealed for the realm key)
pub const LOCKER_SECRET_SIZE: usize = 16;
/// Main secret size in bytes (sealed for every authority key)
pub const MAIN_SECRET_SIZE: usize = 16;

/// Freshly generated secrets for one snapshot.
pub struct SecretsPack {
    pub locker_secret: Zeroizing<Vec<u8>>,
    pub main_secret: Zeroizing<Vec<u8>>,
    /// Passphrase for the payload stream cipher
    pub final_secret: Zeroizing<Vec<u8>>,
    pub local_snap_at: OffsetDateTime,
}

impl fmt::Debug for SecretsPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsPack")
            .field("locker_secret", &"[REDACTED]")
            .field("main_secret", &"[REDACTED]")
            .field("final_secret", &"[REDACTED]")
            .field("local_snap_at", &self.local_snap_at)
            .finish()
    }
}

/// Everything the final secret is built from.
#[derive(Clone, Copy)]
pub struct FinalSecretInput<'a> {
    pub tag: &'a str,
    pub brigade_id: &'a str,
    /// Unix seconds
    pub global_snap_at: i64,
    /// Unix seconds
    pub local_snap_at: i64,
    pub psk: &'a [u8],
    pub locker_secret: &'a [u8],
    pub main_secret: &'a [u8],
}

/// Generate `len` bytes from the thread-local CSPRNG.
pub fn generate_secret(len: usize) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(vec![0u8; len]);
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// Generate the locker and main secrets and derive the final secret.
///
/// `local_snap_at` is taken from the wall clock. PSK length is not checked
/// here.
pub fn derive_secrets(
    tag: &str,
    brigade_id: &str,
    global_snap_at: OffsetDateTime,
    psk: &[u8],
    layout: SecretLayout,
) -> CryptoResult<SecretsPack> {
    if tag.is_empty() {
        return Err(CryptoError::EmptyTag);
    }

    let local_snap_at = OffsetDateTime::now_utc();
    let locker_secret = generate_secret(LOCKER_SECRET_SIZE);
    let main_secret = generate_secret(MAIN_SECRET_SIZE);

    let final_secret = final_secret(
        layout,
        &FinalSecretInput {
            tag,
            brigade_id,
            global_snap_at: global_snap_at.unix_timestamp(),
            local_snap_at: local_snap_at.unix_timestamp(),
            psk,
            locker_secret: &locker_secret,
            main_secret: &main_secret,
        },
    );

    tracing::debug!(
        tag,
        brigade_id,
        ?layout,
        final_secret_len = final_secret.len(),
        "derived snapshot secrets"
    );

    Ok(SecretsPack {
        locker_secret,
        main_secret,
        final_secret,
        local_snap_at,
    })
}

/// Assemble the final secret in the given layout.
///
/// Both layouts keep the order tag, brigade id, global time, local time,
/// PSK, locker secret, main secret.
///
/// `Legacy` renders the timestamps as decimal text separated by a space and
/// every byte string as `[b0 b1 ...]` in decimal, e.g.
/// `tb11700000000 1700000001 [0 1] [255] []`.
///
/// `Binary` writes the timestamps as 8-byte big-endian integers and the
/// byte strings raw.
pub fn final_secret(layout: SecretLayout, input: &FinalSecretInput<'_>) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(estimated_len(layout, input)));
    out.extend_from_slice(input.tag.as_bytes());
    out.extend_from_slice(input.brigade_id.as_bytes());

    match layout {
        SecretLayout::Legacy => {
            // writes into a Vec never fail
            let _ = write!(out, "{} {} ", input.global_snap_at, input.local_snap_at);
            render_bytes(&mut out, input.psk);
            out.push(b' ');
            render_bytes(&mut out, input.locker_secret);
            out.push(b' ');
            render_bytes(&mut out, input.main_secret);
        }
        SecretLayout::Binary => {
            out.extend_from_slice(&input.global_snap_at.to_be_bytes());
            out.extend_from_slice(&input.local_snap_at.to_be_bytes());
            out.extend_from_slice(input.psk);
            out.extend_from_slice(input.locker_secret);
            out.extend_from_slice(input.main_secret);
        }
    }

    out
}

fn render_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'[');
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        let _ = write!(out, "{b}");
    }
    out.push(b']');
}

fn estimated_len(layout: SecretLayout, input: &FinalSecretInput<'_>) -> usize {
    let secrets = input.psk.len() + input.locker_secret.len() + input.main_secret.len();
    let head = input.tag.len() + input.brigade_id.len();
    match layout {
        // up to "255 " per byte plus brackets
        SecretLayout::Legacy => head + 2 * 21 + secrets * 4 + 8,
        SecretLayout::Binary => head + 16 + secrets,
    }
}
