//! Bounded in-process pipes between pipeline stages
//!
//! The tee is the only reader of the source stream. It copies every chunk
//! into one [`tokio::io::duplex`] pipe per consumer; a full pipe blocks the
//! tee until its consumer catches up. Consumers run on the blocking pool and
//! read their pipe through [`CancellableReader`], so a failure anywhere
//! closes every pipe at once instead of leaving a stage parked on a read or
//! a write that will never complete.

use std::io::{self, Read};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::error::{SnapError, SnapResult};

/// Capacity of each stage pipe (64 KiB)
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Source read size of the tee
const TEE_CHUNK_SIZE: usize = 16 * 1024;

/// Blocking [`Read`] over the receiving end of a pipe.
///
/// Every read waits on the pipe and on the cancellation token; once the
/// token fires all reads fail.
pub struct CancellableReader<R> {
    inner: R,
    handle: Handle,
    cancel: CancellationToken,
}

impl<R: AsyncRead + Unpin> CancellableReader<R> {
    pub fn new(inner: R, handle: Handle, cancel: CancellationToken) -> Self {
        Self {
            inner,
            handle,
            cancel,
        }
    }
}

impl<R: AsyncRead + Unpin> Read for CancellableReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Self {
            inner,
            handle,
            cancel,
        } = self;

        handle.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(io::Error::other("pipe cancelled")),
                n = inner.read(buf) => n,
            }
        })
    }
}

/// Copy `source` into every pipe until EOF, then close them.
///
/// Returns the number of source bytes read.
pub async fn tee<R: AsyncRead + Unpin>(
    source: R,
    outputs: [DuplexStream; 2],
    cancel: &CancellationToken,
) -> SnapResult<u64> {
    let [mut a, mut b] = outputs;
    let result = tee_inner(source, &mut a, &mut b, cancel).await;
    // the pipes close only after a failure has fired the token
    settle_stage(result, cancel)
}

async fn tee_inner<R: AsyncRead + Unpin>(
    mut source: R,
    a: &mut DuplexStream,
    b: &mut DuplexStream,
    cancel: &CancellationToken,
) -> SnapResult<u64> {
    let mut buf = vec![0u8; TEE_CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => return Err(SnapError::Cancelled),
            n = source.read(&mut buf) => n?,
        };
        if n == 0 {
            break;
        }

        let chunk = &buf[..n];
        tokio::select! {
            _ = cancel.cancelled() => return Err(SnapError::Cancelled),
            written = async { tokio::try_join!(a.write_all(chunk), b.write_all(chunk)) } => {
                written?;
            }
        }
        total += n as u64;
    }

    a.shutdown().await?;
    b.shutdown().await?;
    tracing::debug!(bytes = total, "tee: source drained");
    Ok(total)
}

/// Final bookkeeping for a pipeline stage.
///
/// A stage that fails after the token fired is only a casualty of an
/// earlier failure and reports [`SnapError::Cancelled`]. A stage that fails
/// first fires the token so its siblings stop.
pub fn settle_stage<T>(result: SnapResult<T>, cancel: &CancellationToken) -> SnapResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(_) if cancel.is_cancelled() => Err(SnapError::Cancelled),
        Err(e) => {
            tracing::debug!(error = %e, "pipeline stage failed, cancelling siblings");
            cancel.cancel();
            Err(e)
        }
    }
}
