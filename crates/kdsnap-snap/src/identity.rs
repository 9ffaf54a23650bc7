//! Brigade identity check on the source document

use std::io::{self, BufReader, Read};

use serde::Deserialize;

use crate::error::{SnapError, SnapResult};
use crate::pipe::PIPE_CAPACITY;

/// The only part of the storage document the snapshot cares about
#[derive(Debug, Deserialize)]
struct BrigadeIdentity {
    brigade_id: String,
}

/// Decode the storage document from `r` and compare its `brigade_id`.
///
/// The reader is always drained to EOF before the comparison, so the check
/// consumes exactly the same bytes as the cipher path.
pub fn check_identity<R: Read>(r: R, expected: &str) -> SnapResult<()> {
    let mut r = BufReader::with_capacity(PIPE_CAPACITY, r);

    let doc: BrigadeIdentity = serde_json::from_reader(&mut r).map_err(|e| {
        if e.is_io() {
            SnapError::Io(e.into())
        } else {
            SnapError::SourceDecode(e)
        }
    })?;
    io::copy(&mut r, &mut io::sink())?;

    if doc.brigade_id != expected {
        return Err(SnapError::IdentityMismatch {
            expected: expected.to_string(),
            found: doc.brigade_id,
        });
    }

    tracing::debug!(brigade_id = expected, "identity check passed");
    Ok(())
}
