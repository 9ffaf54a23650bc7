use thiserror::Error;

use kdsnap_crypto::CryptoError;

pub type SnapResult<T> = Result<T, SnapError>;

#[derive(Debug, Error)]
pub enum SnapError {
    /// The source document belongs to another brigade
    #[error("brigade id mismatch: expected {expected}, got {found}")]
    IdentityMismatch { expected: String, found: String },

    #[error("decode source document: {0}")]
    SourceDecode(#[source] serde_json::Error),

    /// A sibling pipeline stage failed first
    #[error("pipeline cancelled")]
    Cancelled,

    #[error("no sealed secret for authority {0} in envelope")]
    AuthorityNotInEnvelope(String),

    #[error("realm key mismatch: envelope is sealed for {expected}, got {found}")]
    RealmKeyMismatch { expected: String, found: String },

    #[error("decode payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
