//! gzip + OpenSSL salted AES-256-CBC, streamed end to end
//!
//! Compression happens before encryption: the cipher pulls from a
//! `GzEncoder` wrapped around the plaintext reader, so sealing never holds
//! more than a few blocks in memory. Opening decrypts the whole payload
//! first; gzip only sees plaintext whose padding already checked out.

use std::io::{self, Read, Write};

use flate2::{read::GzDecoder, read::GzEncoder, Compression};
use kdsnap_crypto::{decrypt_aes256_cbc, encrypt_aes256_cbc};
use zeroize::Zeroizing;

use crate::error::SnapResult;

/// Compress `r` and encrypt it into `w`. Returns ciphertext bytes written.
pub fn compress_encrypt<R: Read, W: Write>(r: R, w: W, secret: &[u8]) -> SnapResult<u64> {
    let gz = GzEncoder::new(r, Compression::default());
    Ok(encrypt_aes256_cbc(gz, w, secret)?)
}

/// Decrypt `r` and decompress it into `w`.
///
/// A wrong secret fails as [`CryptoError::InvalidPadding`] unless the
/// garbage happens to end in valid padding; gzip then rejects it.
///
/// [`CryptoError::InvalidPadding`]: kdsnap_crypto::CryptoError::InvalidPadding
pub fn decrypt_decompress<R: Read, W: Write>(r: R, mut w: W, secret: &[u8]) -> SnapResult<()> {
    let mut compressed = Zeroizing::new(Vec::new());
    decrypt_aes256_cbc(r, &mut *compressed, secret)?;

    io::copy(&mut GzDecoder::new(compressed.as_slice()), &mut w)?;
    Ok(())
}

pub fn compress_encrypt_snapshot<R: Read>(r: R, secret: &[u8]) -> SnapResult<Vec<u8>> {
    let mut out = Vec::new();
    compress_encrypt(r, &mut out, secret)?;
    Ok(out)
}

pub fn decrypt_decompress_snapshot<R: Read>(r: R, secret: &[u8]) -> SnapResult<Vec<u8>> {
    let mut out = Vec::new();
    decrypt_decompress(r, &mut out, secret)?;
    Ok(out)
}
