use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("empty secret")]
    EmptySecret,

    #[error("secret too long: {len} bytes (max {max} for this key)")]
    SecretTooLong { len: usize, max: usize },

    #[error("empty tag")]
    EmptyTag,

    #[error("empty data")]
    EmptyData,

    #[error("salt prefix mismatch")]
    SaltPrefixMismatch,

    #[error("unexpected EOF: block size: {0}")]
    UnexpectedEof(usize),

    #[error("invalid pkcs7 block size {0}")]
    InvalidBlockSize(usize),

    #[error("pkcs7: data is not block-aligned")]
    NotAligned,

    #[error("pkcs7: invalid padding")]
    InvalidPadding,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("key is not a RSA key")]
    KeyNotRsa,

    #[error("RSA key size {bits} bits outside {min}..={max}")]
    RsaKeySize { bits: usize, min: usize, max: usize },

    #[error("unsupported key algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("encrypted private keys are not supported")]
    EncryptedPrivateKey,

    #[error("no recipient keys")]
    NoRecipients,

    #[error("parse key: {0}")]
    KeyParse(#[from] ssh_key::Error),

    #[error("parse private key: {0}")]
    PrivateKey(String),

    #[error("key file is not valid UTF-8: {0}")]
    KeyEncoding(#[from] std::str::Utf8Error),

    #[error("read keyfile: {0}")]
    KeyFile(#[from] kdsnap_core::KdsnapError),

    #[error("rsa: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("decode encrypted secret: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
