//! kdsnap-snap: sealing and recovering brigade storage snapshots
//!
//! ```text
//!                     ┌─> pipe ─> identity check (brigade_id)
//! source ─> tee ──────┤
//!                     └─> pipe ─> gzip ─> AES-256-CBC ─> payload
//! ```
//! Every stage shares one cancellation token: the first failure closes all
//! pipes, and the envelope is only assembled when every stage succeeded.

pub mod assemble;
pub mod compress;
pub mod error;
pub mod identity;
pub mod pipe;
pub mod recover;

pub use assemble::{make_snapshot, SnapOpts};
pub use compress::{
    compress_encrypt, compress_encrypt_snapshot, decrypt_decompress, decrypt_decompress_snapshot,
};
pub use error::{SnapError, SnapResult};
pub use recover::{recover_snapshot, RecoveryKeys};
