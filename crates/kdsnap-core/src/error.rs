use std::path::PathBuf;
use thiserror::Error;

pub type KdsnapResult<T> = Result<T, KdsnapError>;

#[derive(Debug, Error)]
pub enum KdsnapError {
    #[error("file {path} is too big: {size} bytes (limit {limit})")]
    FileTooBig {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("envelope error: {0}")]
    Envelope(#[from] serde_json::Error),
}
