//! Little-endian base-128 variable-length integers.
//!
//! This is the integer form used by the contract virtual machine's bytecode: 7 value bits per
//! byte, least significant group first, high bit set on every byte except the last.

use core::fmt;

/// The longest encoding of a `u64`.
pub const MAX_LEN: usize = 10;

/// Appends the encoding of `value` to `out`.
pub fn write(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let to_write = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            out.push(to_write | 0x80);
        } else {
            out.push(to_write);
            break;
        }
    }
}

/// Encodes `value` into a fresh buffer.
pub fn encode(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_LEN);
    write(value, &mut out);
    out
}

/// Returns the number of bytes `encode(value)` produces.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    core::cmp::max(1, (bits + 6) / 7)
}

/// Decodes one integer, advancing the cursor past it.
pub fn decode(bytes: &mut &[u8]) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    for (i, byte) in bytes.iter().enumerate() {
        if i == MAX_LEN || (i == MAX_LEN - 1 && *byte > 1) {
            return Err(DecodeError::Overflow);
        }
        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            *bytes = &bytes[(i + 1)..];
            return Ok(value);
        }
    }
    Err(DecodeError::UnexpectedEnd)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DecodeError {
    /// The last byte still had the continuation bit set.
    UnexpectedEnd,
    /// The encoded value doesn't fit into 64 bits.
    Overflow,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEnd => f.write_str("variable-length integer is truncated"),
            DecodeError::Overflow => f.write_str("variable-length integer overflows 64 bits"),
        }
    }
}

impl std::error::Error for DecodeError {}
