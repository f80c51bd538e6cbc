//! Cursor-style readers.
//!
//! All readers take `&mut &[u8]` and advance the slice past the consumed bytes only on success.

use core::convert::{TryFrom, TryInto};
use core::fmt;

pub(crate) trait Int {
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_int {
    ($($type:ty),*) => {
        $(
            impl Int for $type {
                type Bytes = [u8; core::mem::size_of::<$type>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$type>::from_be_bytes(bytes)
                }
            }
        )*
    }
}

impl_int!(u8, u16, u32, u64);

/// Reads a big-endian integer.
pub(crate) fn be<T: Int>(bytes: &mut &[u8]) -> Result<T, UnexpectedEnd> {
    let byte_arr: T::Bytes = bytes
        .get(..core::mem::size_of::<T::Bytes>())
        .ok_or(UnexpectedEnd)?
        .try_into()
        .map_err(|_| UnexpectedEnd)?;
    *bytes = &bytes[core::mem::size_of::<T::Bytes>()..];
    Ok(T::from_be_bytes(byte_arr))
}

/// Reads exactly `len` bytes.
pub(crate) fn take<'a>(bytes: &mut &'a [u8], len: usize) -> Result<&'a [u8], UnexpectedEnd> {
    if bytes.len() < len {
        return Err(UnexpectedEnd);
    }
    let (taken, rest) = bytes.split_at(len);
    *bytes = rest;
    Ok(taken)
}

/// The input ended before the value was complete.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnexpectedEnd;

impl fmt::Display for UnexpectedEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unexpected end of input")
    }
}

impl std::error::Error for UnexpectedEnd {}
