//! OpenSSL-compatible salted AES-256-CBC stream cipher
//!
//! Interoperates with `openssl enc -aes-256-cbc -pbkdf2 -md sha256`.
//!
//! Wire format:
//! ```text
//! ["Salted__" (8 bytes)][salt (8 bytes)][AES-256-CBC blocks (16 bytes each), PKCS#7 padded]
//! key ‖ iv = PBKDF2-HMAC-SHA256(secret, salt, 10000 rounds, 48 bytes)
//! ```
//! There is no length prefix: the end of the ciphertext is the end of the stream.

use std::io::{ErrorKind, Read, Write};

use aes::cipher::{generic_array::GenericArray, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::pkcs7;

/// Size of the AES-256 key
pub const AES256_KEY_SIZE: usize = 32;

/// AES block size, also the IV size
pub const BLOCK_SIZE: usize = 16;

/// Size of the salt used by OpenSSL
pub const SALT_SIZE: usize = 8;

/// PBKDF2 rounds, the `openssl enc -pbkdf2` default
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Magic prefix of salted OpenSSL output
pub const SALTED_PREFIX: &[u8; 8] = b"Salted__";

/// Header size: prefix + salt
pub const HEADER_SIZE: usize = SALTED_PREFIX.len() + SALT_SIZE;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Encrypt everything `r` yields into `w` under a fresh random salt.
///
/// Returns the number of bytes written, header included.
pub fn encrypt_aes256_cbc<R: Read, W: Write>(r: R, w: W, secret: &[u8]) -> CryptoResult<u64> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);

    encrypt_aes256_cbc_with_salt(r, w, secret, &salt)
}

/// Encrypt with a caller-chosen salt. Output is deterministic for a given
/// `(secret, salt, input)`; never reuse a salt for different inputs.
pub fn encrypt_aes256_cbc_with_salt<R: Read, W: Write>(
    mut r: R,
    mut w: W,
    secret: &[u8],
    salt: &[u8; SALT_SIZE],
) -> CryptoResult<u64> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let (key, iv) = derive_key_iv(secret, salt);
    let mut cipher = Aes256CbcEnc::new(
        GenericArray::from_slice(&key[..]),
        GenericArray::from_slice(&iv[..]),
    );

    w.write_all(SALTED_PREFIX)?;
    w.write_all(salt)?;
    let mut written = HEADER_SIZE as u64;

    loop {
        let mut block = [0u8; BLOCK_SIZE];
        let n = read_full(&mut r, &mut block)?;

        if n != BLOCK_SIZE {
            let padded = pkcs7::pad(&block[..n], BLOCK_SIZE)?;
            block.copy_from_slice(&padded);
        }

        cipher.encrypt_block_mut(GenericArray::from_mut_slice(&mut block));
        w.write_all(&block)?;
        written += BLOCK_SIZE as u64;

        if n != BLOCK_SIZE {
            break;
        }
    }

    w.flush()?;
    tracing::trace!(bytes = written, "aes-256-cbc: encrypted");
    Ok(written)
}

/// Decrypt an OpenSSL salted stream from `r` into `w`.
///
/// Blocks are decrypted with a one-block delay: a block is only released
/// once the next read proves it is not the last one, because only the last
/// block carries padding. Returns the number of plaintext bytes written.
pub fn decrypt_aes256_cbc<R: Read, W: Write>(
    mut r: R,
    mut w: W,
    secret: &[u8],
) -> CryptoResult<u64> {
    if secret.is_empty() {
        return Err(CryptoError::EmptySecret);
    }

    let salt = read_salt(&mut r)?;
    let (key, iv) = derive_key_iv(secret, &salt);
    let mut cipher = Aes256CbcDec::new(
        GenericArray::from_slice(&key[..]),
        GenericArray::from_slice(&iv[..]),
    );

    let mut prev: Option<Zeroizing<[u8; BLOCK_SIZE]>> = None;
    let mut written = 0u64;

    loop {
        let mut block = Zeroizing::new([0u8; BLOCK_SIZE]);
        let n = read_full(&mut r, &mut block[..])?;

        if n != 0 && n != BLOCK_SIZE {
            return Err(CryptoError::UnexpectedEof(n));
        }

        match (prev.take(), n) {
            (None, 0) => return Err(CryptoError::EmptyData),
            (None, _) => prev = Some(block),
            (Some(mut last), 0) => {
                cipher.decrypt_block_mut(GenericArray::from_mut_slice(&mut last[..]));
                let plain = pkcs7::strip(&last[..], BLOCK_SIZE)?;
                w.write_all(plain)?;
                written += plain.len() as u64;
                break;
            }
            (Some(mut ready), _) => {
                cipher.decrypt_block_mut(GenericArray::from_mut_slice(&mut ready[..]));
                w.write_all(&ready[..])?;
                written += BLOCK_SIZE as u64;
                prev = Some(block);
            }
        }
    }

    w.flush()?;
    tracing::trace!(bytes = written, "aes-256-cbc: decrypted");
    Ok(written)
}

/// Derive the AES-256 key and IV from the passphrase and salt.
fn derive_key_iv(
    secret: &[u8],
    salt: &[u8],
) -> (Zeroizing<[u8; AES256_KEY_SIZE]>, Zeroizing<[u8; BLOCK_SIZE]>) {
    let mut okm = Zeroizing::new([0u8; AES256_KEY_SIZE + BLOCK_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ITERATIONS, &mut okm[..]);

    let mut key = Zeroizing::new([0u8; AES256_KEY_SIZE]);
    let mut iv = Zeroizing::new([0u8; BLOCK_SIZE]);
    key.copy_from_slice(&okm[..AES256_KEY_SIZE]);
    iv.copy_from_slice(&okm[AES256_KEY_SIZE..]);
    (key, iv)
}

fn read_salt<R: Read>(r: &mut R) -> CryptoResult<[u8; SALT_SIZE]> {
    let mut header = [0u8; HEADER_SIZE];
    r.read_exact(&mut header)?;

    let (prefix, salt) = header.split_at(SALTED_PREFIX.len());
    if prefix != SALTED_PREFIX {
        return Err(CryptoError::SaltPrefixMismatch);
    }

    let mut out = [0u8; SALT_SIZE];
    out.copy_from_slice(salt);
    Ok(out)
}

/// Fill `buf` as far as the reader allows. Short counts only happen at EOF.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
