//! Canonical MessagePack.
//!
//! The ledger hashes and signs MessagePack encodings, so the encoding has to be canonical:
//!
//! * integers always use the smallest representation,
//! * map keys are sorted bytewise,
//! * fields holding a zero/empty value are omitted,
//! * floating point is never used.
//!
//! [`CanonicalMap`] takes care of the last three, the `write_*` functions of the first one.

use core::fmt;
use super::read::{self, UnexpectedEnd};

pub fn write_uint(value: u64, out: &mut Vec<u8>) {
    if value < 0x80 {
        out.push(value as u8);
    } else if value <= u64::from(u8::MAX) {
        out.push(0xcc);
        out.push(value as u8);
    } else if value <= u64::from(u16::MAX) {
        out.push(0xcd);
        out.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= u64::from(u32::MAX) {
        out.push(0xce);
        out.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        out.push(0xcf);
        out.extend_from_slice(&value.to_be_bytes());
    }
}

pub fn write_str(value: &str, out: &mut Vec<u8>) {
    let len = value.len();
    if len < 32 {
        out.push(0xa0 | len as u8);
    } else {
        write_len(len, [0xd9, 0xda, 0xdb], out);
    }
    out.extend_from_slice(value.as_bytes());
}

pub fn write_bin(value: &[u8], out: &mut Vec<u8>) {
    write_len(value.len(), [0xc4, 0xc5, 0xc6], out);
    out.extend_from_slice(value);
}

pub fn write_array_len(len: usize, out: &mut Vec<u8>) {
    if len < 16 {
        out.push(0x90 | len as u8);
    } else {
        write_len16(len, [0xdc, 0xdd], out);
    }
}

pub fn write_map_len(len: usize, out: &mut Vec<u8>) {
    if len < 16 {
        out.push(0x80 | len as u8);
    } else {
        write_len16(len, [0xde, 0xdf], out);
    }
}

fn write_len(len: usize, markers: [u8; 3], out: &mut Vec<u8>) {
    if len <= usize::from(u8::MAX) {
        out.push(markers[0]);
        out.push(len as u8);
    } else {
        write_len16(len, [markers[1], markers[2]], out);
    }
}

fn write_len16(len: usize, markers: [u8; 2], out: &mut Vec<u8>) {
    if len <= usize::from(u16::MAX) {
        out.push(markers[0]);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        // Nothing we encode comes close to 4 GiB.
        assert!(len <= u32::MAX as usize, "length {} doesn't fit MessagePack", len);
        out.push(markers[1]);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

/// A map under construction.
///
/// Values are encoded eagerly, the keys are sorted when the map is written out. Setters skip
/// zero and empty values so the result matches what the ledger produces for the same object.
#[derive(Debug, Default, Clone)]
pub struct CanonicalMap {
    entries: Vec<(&'static str, Vec<u8>)>,
}

impl CanonicalMap {
    pub fn new() -> Self {
        CanonicalMap::default()
    }

    /// Inserts an already encoded value unconditionally.
    pub fn raw(&mut self, key: &'static str, encoded: Vec<u8>) -> &mut Self {
        debug_assert!(self.entries.iter().all(|(existing, _)| *existing != key), "duplicate key {}", key);
        self.entries.push((key, encoded));
        self
    }

    pub fn uint(&mut self, key: &'static str, value: u64) -> &mut Self {
        if value != 0 {
            let mut encoded = Vec::with_capacity(9);
            write_uint(value, &mut encoded);
            self.raw(key, encoded);
        }
        self
    }

    pub fn str(&mut self, key: &'static str, value: &str) -> &mut Self {
        if !value.is_empty() {
            let mut encoded = Vec::with_capacity(value.len() + 5);
            write_str(value, &mut encoded);
            self.raw(key, encoded);
        }
        self
    }

    pub fn bin(&mut self, key: &'static str, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            let mut encoded = Vec::with_capacity(value.len() + 5);
            write_bin(value, &mut encoded);
            self.raw(key, encoded);
        }
        self
    }

    /// Fixed-size byte arrays (keys, digests) are empty when all bytes are zero.
    pub fn fixed(&mut self, key: &'static str, value: &[u8]) -> &mut Self {
        if value.iter().any(|byte| *byte != 0) {
            let mut encoded = Vec::with_capacity(value.len() + 2);
            write_bin(value, &mut encoded);
            self.raw(key, encoded);
        }
        self
    }

    pub fn uint_array(&mut self, key: &'static str, values: &[u64]) -> &mut Self {
        if !values.is_empty() {
            let mut encoded = Vec::new();
            write_array_len(values.len(), &mut encoded);
            for value in values {
                write_uint(*value, &mut encoded);
            }
            self.raw(key, encoded);
        }
        self
    }

    pub fn bin_array<'a, I>(&mut self, key: &'static str, values: I) -> &mut Self where I: IntoIterator<Item = &'a [u8]>, I::IntoIter: ExactSizeIterator {
        let values = values.into_iter();
        if values.len() != 0 {
            let mut encoded = Vec::new();
            write_array_len(values.len(), &mut encoded);
            for value in values {
                write_bin(value, &mut encoded);
            }
            self.raw(key, encoded);
        }
        self
    }

    pub fn map(&mut self, key: &'static str, value: CanonicalMap) -> &mut Self {
        if !value.is_empty() {
            let mut encoded = Vec::new();
            value.serialize(&mut encoded);
            self.raw(key, encoded);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn serialize(mut self, out: &mut Vec<u8>) {
        self.entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out.reserve(1 + self.entries.iter().map(|(key, value)| key.len() + 1 + value.len()).sum::<usize>());
        write_map_len(self.entries.len(), out);
        for (key, value) in &self.entries {
            write_str(key, out);
            out.extend_from_slice(value);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize(&mut out);
        out
    }
}

/// Nesting limit for [`skip_value`].
const MAX_DEPTH: usize = 32;

/// Advances the cursor past exactly one encoded value of any type.
///
/// This is what allows decoding concatenated records by stream position.
pub fn skip_value(bytes: &mut &[u8]) -> Result<(), ReadError> {
    let mut cursor = *bytes;
    skip_nested(&mut cursor, 0)?;
    *bytes = cursor;
    Ok(())
}

fn skip_nested(bytes: &mut &[u8], depth: usize) -> Result<(), ReadError> {
    if depth > MAX_DEPTH {
        return Err(ReadError::TooDeep);
    }
    let marker = read::be::<u8>(bytes)?;
    let (payload, children) = match marker {
        0x00..=0x7f | 0xe0..=0xff | 0xc0 | 0xc2 | 0xc3 => (0, 0),
        0x80..=0x8f => (0, 2 * usize::from(marker & 0x0f)),
        0x90..=0x9f => (0, usize::from(marker & 0x0f)),
        0xa0..=0xbf => (usize::from(marker & 0x1f), 0),
        0xc4 | 0xd9 => (usize::from(read::be::<u8>(bytes)?), 0),
        0xc5 | 0xda => (usize::from(read::be::<u16>(bytes)?), 0),
        0xc6 | 0xdb => (read::be::<u32>(bytes)? as usize, 0),
        0xc7 => (usize::from(read::be::<u8>(bytes)?) + 1, 0),
        0xc8 => (usize::from(read::be::<u16>(bytes)?) + 1, 0),
        0xc9 => (read::be::<u32>(bytes)? as usize + 1, 0),
        0xca => (4, 0),
        0xcb => (8, 0),
        0xcc | 0xd0 => (1, 0),
        0xcd | 0xd1 => (2, 0),
        0xce | 0xd2 => (4, 0),
        0xcf | 0xd3 => (8, 0),
        0xd4 => (2, 0),
        0xd5 => (3, 0),
        0xd6 => (5, 0),
        0xd7 => (9, 0),
        0xd8 => (17, 0),
        0xdc => (0, usize::from(read::be::<u16>(bytes)?)),
        0xdd => (0, read::be::<u32>(bytes)? as usize),
        0xde => (0, 2 * usize::from(read::be::<u16>(bytes)?)),
        0xdf => (0, 2 * read::be::<u32>(bytes)? as usize),
        0xc1 => return Err(ReadError::InvalidMarker(marker)),
    };
    read::take(bytes, payload)?;
    for _ in 0..children {
        skip_nested(bytes, depth + 1)?;
    }
    Ok(())
}

/// Splits concatenated values into individual encodings.
pub fn split_stream(mut bytes: &[u8]) -> Result<Vec<&[u8]>, ReadError> {
    let mut values = Vec::new();
    while !bytes.is_empty() {
        let before = bytes;
        skip_value(&mut bytes)?;
        values.push(&before[..(before.len() - bytes.len())]);
    }
    Ok(values)
}

pub fn read_map_len(bytes: &mut &[u8]) -> Result<usize, ReadError> {
    let mut cursor = *bytes;
    let len = match read::be::<u8>(&mut cursor)? {
        marker @ 0x80..=0x8f => usize::from(marker & 0x0f),
        0xde => usize::from(read::be::<u16>(&mut cursor)?),
        0xdf => read::be::<u32>(&mut cursor)? as usize,
        marker => return Err(ReadError::UnexpectedMarker(marker)),
    };
    *bytes = cursor;
    Ok(len)
}

pub fn read_str<'a>(bytes: &mut &'a [u8]) -> Result<&'a str, ReadError> {
    let mut cursor = *bytes;
    let len = match read::be::<u8>(&mut cursor)? {
        marker @ 0xa0..=0xbf => usize::from(marker & 0x1f),
        0xd9 => usize::from(read::be::<u8>(&mut cursor)?),
        0xda => usize::from(read::be::<u16>(&mut cursor)?),
        0xdb => read::be::<u32>(&mut cursor)? as usize,
        marker => return Err(ReadError::UnexpectedMarker(marker)),
    };
    let value = core::str::from_utf8(read::take(&mut cursor, len)?).map_err(|_| ReadError::InvalidUtf8)?;
    *bytes = cursor;
    Ok(value)
}

pub fn read_bin<'a>(bytes: &mut &'a [u8]) -> Result<&'a [u8], ReadError> {
    let mut cursor = *bytes;
    let len = match read::be::<u8>(&mut cursor)? {
        0xc4 => usize::from(read::be::<u8>(&mut cursor)?),
        0xc5 => usize::from(read::be::<u16>(&mut cursor)?),
        0xc6 => read::be::<u32>(&mut cursor)? as usize,
        marker => return Err(ReadError::UnexpectedMarker(marker)),
    };
    let value = read::take(&mut cursor, len)?;
    *bytes = cursor;
    Ok(value)
}

pub fn read_uint(bytes: &mut &[u8]) -> Result<u64, ReadError> {
    let mut cursor = *bytes;
    let value = match read::be::<u8>(&mut cursor)? {
        marker @ 0x00..=0x7f => u64::from(marker),
        0xcc => u64::from(read::be::<u8>(&mut cursor)?),
        0xcd => u64::from(read::be::<u16>(&mut cursor)?),
        0xce => u64::from(read::be::<u32>(&mut cursor)?),
        0xcf => read::be::<u64>(&mut cursor)?,
        marker => return Err(ReadError::UnexpectedMarker(marker)),
    };
    *bytes = cursor;
    Ok(value)
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReadError {
    UnexpectedEnd,
    /// `0xc1` is reserved and never valid.
    InvalidMarker(u8),
    /// A valid marker but not of the requested type.
    UnexpectedMarker(u8),
    InvalidUtf8,
    TooDeep,
}

impl From<UnexpectedEnd> for ReadError {
    fn from(_: UnexpectedEnd) -> Self {
        ReadError::UnexpectedEnd
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReadError::UnexpectedEnd => f.write_str("unexpected end of MessagePack data"),
            ReadError::InvalidMarker(marker) => write!(f, "invalid MessagePack marker {:#04x}", marker),
            ReadError::UnexpectedMarker(marker) => write!(f, "unexpected MessagePack marker {:#04x}", marker),
            ReadError::InvalidUtf8 => f.write_str("MessagePack string is not UTF-8"),
            ReadError::TooDeep => write!(f, "MessagePack nesting deeper than {}", MAX_DEPTH),
        }
    }
}

impl std::error::Error for ReadError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_uint(value, &mut out);
        out
    }

    #[test]
    fn uint_is_minimal() {
        assert_eq!(uint(0), [0x00]);
        assert_eq!(uint(127), [0x7f]);
        assert_eq!(uint(128), [0xcc, 0x80]);
        assert_eq!(uint(255), [0xcc, 0xff]);
        assert_eq!(uint(256), [0xcd, 0x01, 0x00]);
        assert_eq!(uint(65536), [0xce, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(uint(1 << 32), hex_lit::hex!("cf0000000100000000"));
    }

    #[test]
    fn str_and_bin_headers() {
        let mut out = Vec::new();
        write_str("snd", &mut out);
        assert_eq!(out, hex_lit::hex!("a3736e64"));

        let long = "x".repeat(40);
        let mut out = Vec::new();
        write_str(&long, &mut out);
        assert_eq!(&out[..2], &[0xd9, 40]);

        let mut out = Vec::new();
        write_bin(&[0xaa; 32], &mut out);
        assert_eq!(&out[..2], &[0xc4, 0x20]);
        assert_eq!(out.len(), 34);

        let mut out = Vec::new();
        write_bin(&vec![0; 300], &mut out);
        assert_eq!(&out[..3], &[0xc5, 0x01, 0x2c]);
    }

    #[test]
    fn map_sorts_keys_and_skips_empty() {
        let mut map = CanonicalMap::new();
        map.uint("fv", 10)
            .str("type", "pay")
            .uint("fee", 0)
            .bin("note", &[])
            .fixed("grp", &[0; 32])
            .uint("amt", 5);
        assert_eq!(map.len(), 3);
        let bytes = map.into_bytes();
        let mut cursor = &*bytes;
        assert_eq!(read_map_len(&mut cursor), Ok(3));
        assert_eq!(read_str(&mut cursor), Ok("amt"));
        assert_eq!(read_uint(&mut cursor), Ok(5));
        assert_eq!(read_str(&mut cursor), Ok("fv"));
        assert_eq!(read_uint(&mut cursor), Ok(10));
        assert_eq!(read_str(&mut cursor), Ok("type"));
        assert_eq!(read_str(&mut cursor), Ok("pay"));
        assert!(cursor.is_empty());
    }

    #[test]
    fn empty_nested_map_is_skipped() {
        let mut map = CanonicalMap::new();
        map.map("apgs", CanonicalMap::new()).uint_array("apfa", &[]).bin_array("apaa", Vec::<&[u8]>::new());
        assert!(map.is_empty());
        assert_eq!(map.into_bytes(), [0x80]);
    }

    #[test]
    fn skip_nested_values() {
        let mut inner = CanonicalMap::new();
        inner.uint("nui", 3).uint("nbs", 300);
        let mut outer = CanonicalMap::new();
        outer.map("apgs", inner).bin_array("apaa", vec![&b"ab"[..], &b""[..]]).str("type", "appl");
        let mut bytes = outer.into_bytes();
        let len = bytes.len();
        bytes.extend_from_slice(&[0xc3, 0x01]);

        let mut cursor = &*bytes;
        skip_value(&mut cursor).unwrap();
        assert_eq!(cursor.len(), bytes.len() - len);
        assert_eq!(split_stream(&bytes).unwrap().len(), 3);
    }

    #[test]
    fn skip_rejects_truncated_and_reserved() {
        assert_eq!(skip_value(&mut &[0x92, 0x01][..]), Err(ReadError::UnexpectedEnd));
        assert_eq!(skip_value(&mut &[0xc4, 0x05, 0x00][..]), Err(ReadError::UnexpectedEnd));
        assert_eq!(skip_value(&mut &[0xc1][..]), Err(ReadError::InvalidMarker(0xc1)));
        let deep = vec![0x91; MAX_DEPTH + 2];
        assert_eq!(skip_value(&mut &*deep), Err(ReadError::TooDeep));
    }

    #[test]
    fn failed_skip_keeps_cursor() {
        let bytes = [0x92, 0x01];
        let mut cursor = &bytes[..];
        assert!(skip_value(&mut cursor).is_err());
        assert_eq!(cursor, &bytes[..]);
    }

    quickcheck::quickcheck! {
        fn split_recovers_concatenation(values: Vec<(u64, String, Vec<u8>)>) -> bool {
            let mut stream = Vec::new();
            let mut records = Vec::new();
            for (number, text, blob) in &values {
                let mut map = CanonicalMap::new();
                map.uint("a", *number).str("b", text).bin("c", blob);
                let record = map.into_bytes();
                stream.extend_from_slice(&record);
                records.push(record);
            }
            let split = split_stream(&stream).unwrap();
            split.len() == records.len() && split.iter().zip(&records).all(|(a, b)| *a == &b[..])
        }
    }
}
