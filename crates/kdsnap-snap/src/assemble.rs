//! Snapshot assembly: secrets, wrapping, the tee pipeline and the envelope

use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::RsaPublicKey;
use secrecy::{ExposeSecret, SecretSlice};
use time::OffsetDateTime;
use tokio::io::AsyncRead;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use kdsnap_core::EncryptedBrigade;
use kdsnap_crypto::{
    derive_secrets, wrap_for_authorities, wrap_for_realm, Fingerprint, RecipientKey, SecretLayout,
    SecretsPack,
};

use crate::compress::compress_encrypt;
use crate::error::{SnapError, SnapResult};
use crate::identity::check_identity;
use crate::pipe::{settle_stage, tee, CancellableReader, PIPE_CAPACITY};

/// Everything a snapshot needs besides the source stream
pub struct SnapOpts {
    pub tag: String,
    pub brigade_id: String,
    pub global_snap_at: OffsetDateTime,
    pub psk: SecretSlice<u8>,
    pub realm_fp: Fingerprint,
    pub realm_key: RsaPublicKey,
    pub authorities: Vec<RecipientKey>,
    pub layout: SecretLayout,
}

/// Seal the brigade storage read from `source`.
///
/// `source` is read exactly once. Its bytes feed the identity check and the
/// gzip + cipher path concurrently; the envelope is only built once both
/// have consumed the whole stream and succeeded.
pub async fn make_snapshot<R>(source: R, opts: &SnapOpts) -> SnapResult<EncryptedBrigade>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let SecretsPack {
        locker_secret,
        main_secret,
        final_secret,
        local_snap_at,
    } = derive_secrets(
        &opts.tag,
        &opts.brigade_id,
        opts.global_snap_at,
        opts.psk.expose_secret(),
        opts.layout,
    )?;

    let encrypted_locker_secret = STANDARD.encode(wrap_for_realm(&locker_secret, &opts.realm_key)?);
    let secrets = wrap_for_authorities(&main_secret, &opts.authorities)?;

    let payload = seal_stream(source, opts.brigade_id.clone(), final_secret).await?;

    let envelope = EncryptedBrigade {
        tag: opts.tag.clone(),
        global_snap_at: opts.global_snap_at,
        brigade_id: opts.brigade_id.clone(),
        payload: STANDARD.encode(&payload),
        local_snap_at,
        realm_key_fp: opts.realm_fp.to_string(),
        encrypted_locker_secret,
        secrets,
    };

    tracing::info!(
        brigade_id = %envelope.brigade_id,
        tag = %envelope.tag,
        authorities = envelope.secrets.len(),
        payload_bytes = payload.len(),
        "snapshot sealed"
    );
    Ok(envelope)
}

/// Run the tee, the identity check and the cipher path to completion.
async fn seal_stream<R>(
    source: R,
    brigade_id: String,
    final_secret: Zeroizing<Vec<u8>>,
) -> SnapResult<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let cancel = CancellationToken::new();
    let handle = Handle::current();

    let (identity_tx, identity_rx) = tokio::io::duplex(PIPE_CAPACITY);
    let (cipher_tx, cipher_rx) = tokio::io::duplex(PIPE_CAPACITY);

    let tee_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { tee(source, [identity_tx, cipher_tx], &cancel).await })
    };

    let identity_task = {
        let cancel = cancel.clone();
        let mut reader = CancellableReader::new(identity_rx, handle.clone(), cancel.clone());
        tokio::task::spawn_blocking(move || {
            // borrowed so the pipe outlives settle_stage
            let result = check_identity(&mut reader, &brigade_id);
            settle_stage(result, &cancel)
        })
    };

    let cipher_task = {
        let cancel = cancel.clone();
        let mut reader = CancellableReader::new(cipher_rx, handle, cancel.clone());
        tokio::task::spawn_blocking(move || {
            let mut payload = Vec::new();
            let result =
                compress_encrypt(&mut reader, &mut payload, &final_secret).map(|_| payload);
            settle_stage(result, &cancel)
        })
    };

    let (tee_res, identity_res, cipher_res) = tokio::join!(
        join_stage(tee_task, &cancel),
        join_stage(identity_task, &cancel),
        join_stage(cipher_task, &cancel),
    );

    let (read, (), payload) = first_failure(tee_res, identity_res, cipher_res)?;
    tracing::debug!(source_bytes = read, payload_bytes = payload.len(), "pipeline done");
    Ok(payload)
}

/// Await a stage task; a panicked task cancels its siblings too.
async fn join_stage<T>(
    task: JoinHandle<SnapResult<T>>,
    cancel: &CancellationToken,
) -> SnapResult<T> {
    match task.await {
        Ok(result) => result,
        Err(e) => {
            cancel.cancel();
            Err(SnapError::Task(e))
        }
    }
}

/// Pick the error that started the failure over the cancellations it caused.
fn first_failure<A, B, C>(
    a: SnapResult<A>,
    b: SnapResult<B>,
    c: SnapResult<C>,
) -> SnapResult<(A, B, C)> {
    match (a, b, c) {
        (Ok(a), Ok(b), Ok(c)) => Ok((a, b, c)),
        (a, b, c) => {
            let errors = [a.err(), b.err(), c.err()];
            let mut errors = errors.into_iter().flatten();
            let first = errors.next().unwrap_or(SnapError::Cancelled);
            if matches!(first, SnapError::Cancelled) {
                Err(errors
                    .find(|e| !matches!(e, SnapError::Cancelled))
                    .unwrap_or(first))
            } else {
                Err(first)
            }
        }
    }
}
