//! Utility functions for BLS12-381 operations.

use crate::error::{BlsError, BlsResult};

/// I2OSP: big-endian encoding of `value` in exactly `len` bytes
pub fn i2osp(value: u64, len: usize) -> BlsResult<Vec<u8>> {
    if len < 8 && value >> (8 * len) != 0 {
        return Err(BlsError::ExpandMessage(format!(
            "{value} does not fit in {len} bytes"
        )));
    }
    let bytes = value.to_be_bytes();
    let mut out = vec![0u8; len.saturating_sub(8)];
    out.extend_from_slice(&bytes[8usize.saturating_sub(len)..]);
    Ok(out)
}

/// Byte-wise XOR of two equal-length strings
pub fn strxor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// Validates a domain separation tag
pub fn validate_dst(dst: &[u8]) -> BlsResult<()> {
    if dst.is_empty() {
        return Err(BlsError::InvalidDst("DST must not be empty".into()));
    }
    Ok(())
}

/// Converts bytes to hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Converts hex string to bytes, accepting an optional `0x` prefix
pub fn hex_to_bytes(hex: &str) -> BlsResult<Vec<u8>> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    Ok(hex::decode(digits)?)
}
