//! PKCS#7 padding (RFC 5652 §6.3)
//!
//! Padding is always applied: input that is already block-aligned gains one
//! whole block of padding, so the last byte always encodes the pad length.

use crate::error::{CryptoError, CryptoResult};

fn check_block_size(block_size: usize) -> CryptoResult<()> {
    if block_size <= 1 || block_size >= 256 {
        return Err(CryptoError::InvalidBlockSize(block_size));
    }
    Ok(())
}

/// Append PKCS#7 padding up to the next multiple of `block_size`.
pub fn pad(buf: &[u8], block_size: usize) -> CryptoResult<Vec<u8>> {
    check_block_size(block_size)?;

    let pad_len = block_size - buf.len() % block_size;
    let mut out = Vec::with_capacity(buf.len() + pad_len);
    out.extend_from_slice(buf);
    out.resize(buf.len() + pad_len, pad_len as u8);
    Ok(out)
}

/// Validate and remove PKCS#7 padding.
pub fn strip(buf: &[u8], block_size: usize) -> CryptoResult<&[u8]> {
    check_block_size(block_size)?;

    if buf.is_empty() {
        return Err(CryptoError::EmptyData);
    }
    if buf.len() % block_size != 0 {
        return Err(CryptoError::NotAligned);
    }

    let pad_len = buf[buf.len() - 1] as usize;
    if pad_len == 0 || pad_len > block_size {
        return Err(CryptoError::InvalidPadding);
    }

    let (data, padding) = buf.split_at(buf.len() - pad_len);
    if padding.iter().any(|&b| b as usize != pad_len) {
        return Err(CryptoError::InvalidPadding);
    }

    Ok(data)
}
