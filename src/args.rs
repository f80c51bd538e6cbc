//! Encoders for application call arguments.
//!
//! Programs read arguments as raw byte strings, numbers are expected as 8-byte big-endian
//! integers (the format of the `btoi` opcode).

/// Encodes a number argument.
pub fn number(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Encodes a string argument.
pub fn string(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}
