//! Binary encoding primitives shared by the transaction and program modules.
//!
//! Everything in here is deterministic: the same input produces byte-identical output on every
//! platform.

pub mod msgpack;
pub mod read;
pub mod varint;
