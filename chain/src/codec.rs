//! Consensus-critical serialization.
//!
//! Every integer on the wire is fixed-width and big-endian. Byte strings are
//! length-prefixed with either a 1-byte prefix (fields that can never exceed
//! 255 bytes) or a 4-byte prefix (everything else); which width applies is a
//! property of the field, not of the value being encoded, so there is no
//! Bitcoin-style variable-length integer anywhere in this codec. Lists are
//! either a fixed count known from context (e.g. `MultiSig::total`) or
//! preceded by a 4-byte count.
//!
//! `decode(encode(x)) == x` is the round-trip contract every type in this
//! crate must satisfy; it is exercised as a property test per type.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// A serialization error.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    /// an io error prevented decoding: {0}
    #[error("an io error prevented decoding: {0}")]
    Io(#[from] io::Error),
    /// malformed input: {0}
    #[error("malformed input: {0}")]
    Parse(&'static str),
    /// byte string exceeded its field's maximum length ({0} > {1})
    #[error("byte string exceeded its field's maximum length ({0} > {1})")]
    TooLong(usize, usize),
}

pub trait Encode {
    fn encode<W: Write>(&self, writer: W) -> io::Result<()>;

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out).expect("writing to a Vec is infallible");
        out
    }
}

pub trait Decode: Sized {
    fn decode<R: Read>(reader: R) -> Result<Self, CodecError>;
}

/// Writes `bytes` preceded by a 1-byte length. Panics if `bytes` is too long
/// for callers to encode (every such field validates its length on
/// construction, so this is an internal invariant, not a user-facing error).
pub fn write_u8_prefixed<W: Write>(mut writer: W, bytes: &[u8]) -> io::Result<()> {
    assert!(bytes.len() <= u8::MAX as usize, "field exceeds 1-byte length prefix");
    writer.write_u8(bytes.len() as u8)?;
    writer.write_all(bytes)
}

pub fn read_u8_prefixed<R: Read>(mut reader: R) -> Result<Vec<u8>, CodecError> {
    let len = reader.read_u8()? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Writes `bytes` preceded by a 4-byte length.
pub fn write_u32_prefixed<W: Write>(mut writer: W, bytes: &[u8]) -> io::Result<()> {
    writer.write_u32::<BigEndian>(bytes.len() as u32)?;
    writer.write_all(bytes)
}

pub fn read_u32_prefixed<R: Read>(mut reader: R) -> Result<Vec<u8>, CodecError> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    // Bound blind preallocation: a hostile length field should not let a
    // caller force a multi-gigabyte allocation before any data is read.
    let prealloc = std::cmp::min(len, 1 << 20);
    let mut buf = Vec::with_capacity(prealloc);
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(CodecError::Parse("truncated length-prefixed field"));
    }
    Ok(buf)
}

/// Writes a 4-byte count followed by each item's encoding.
pub fn write_list<W: Write, T: Encode>(mut writer: W, items: &[T]) -> io::Result<()> {
    writer.write_u32::<BigEndian>(items.len() as u32)?;
    for item in items {
        item.encode(&mut writer)?;
    }
    Ok(())
}

/// Reads a 4-byte count followed by that many items.
pub fn read_list<R: Read, T: Decode>(mut reader: R) -> Result<Vec<T>, CodecError> {
    let len = reader.read_u32::<BigEndian>()? as usize;
    let mut out = Vec::with_capacity(std::cmp::min(len, 1 << 16));
    for _ in 0..len {
        out.push(T::decode(&mut reader)?);
    }
    Ok(out)
}

/// Reads exactly `count` items with no length prefix of their own; `count`
/// must already be known from context (e.g. a `MultiSig::total` field).
pub fn read_exact_count<R: Read, T: Decode>(mut reader: R, count: usize) -> Result<Vec<T>, CodecError> {
    let mut out = Vec::with_capacity(std::cmp::min(count, 1 << 16));
    for _ in 0..count {
        out.push(T::decode(&mut reader)?);
    }
    Ok(out)
}

macro_rules! impl_int {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Encode for $ty {
            fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
                writer.$write::<BigEndian>(*self)
            }
        }
        impl Decode for $ty {
            fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
                Ok(reader.$read::<BigEndian>()?)
            }
        }
    };
}

impl_int!(u16, write_u16, read_u16);
impl_int!(u32, write_u32, read_u32);
impl_int!(u64, write_u64, read_u64);
impl_int!(i32, write_i32, read_i32);
impl_int!(i64, write_i64, read_i64);

impl Encode for u8 {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&[*self])
    }
}
impl Decode for u8 {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        let mut byte = [0u8; 1];
        reader.read_exact(&mut byte)?;
        Ok(byte[0])
    }
}

impl Encode for bool {
    fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&[*self as u8])
    }
}
impl Decode for bool {
    fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
        match u8::decode(&mut reader)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(CodecError::Parse("invalid bool")),
        }
    }
}

macro_rules! impl_fixed_array {
    ($size:expr) => {
        impl Encode for [u8; $size] {
            fn encode<W: Write>(&self, mut writer: W) -> io::Result<()> {
                writer.write_all(&self[..])
            }
        }
        impl Decode for [u8; $size] {
            fn decode<R: Read>(mut reader: R) -> Result<Self, CodecError> {
                let mut out = [0u8; $size];
                reader.read_exact(&mut out)?;
                Ok(out)
            }
        }
    };
}

impl_fixed_array!(4);
impl_fixed_array!(20);
impl_fixed_array!(32);
impl_fixed_array!(33);

impl<T: Encode> Encode for std::sync::Arc<T> {
    fn encode<W: Write>(&self, writer: W) -> io::Result<()> {
        T::encode(self, writer)
    }
}
impl<T: Decode> Decode for std::sync::Arc<T> {
    fn decode<R: Read>(reader: R) -> Result<Self, CodecError> {
        Ok(std::sync::Arc::new(T::decode(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_round_trip() {
        let mut buf = Vec::new();
        42u32.encode(&mut buf).unwrap();
        0xdead_beefu64
            .encode(&mut buf)
            .unwrap();
        let mut cursor = io::Cursor::new(buf);
        assert_eq!(u32::decode(&mut cursor).unwrap(), 42);
        assert_eq!(u64::decode(&mut cursor).unwrap(), 0xdead_beef);
    }

    #[test]
    fn big_endian_byte_order() {
        let mut buf = Vec::new();
        1u32.encode(&mut buf).unwrap();
        assert_eq!(buf, vec![0, 0, 0, 1]);
    }

    #[test]
    fn u8_prefixed_round_trip() {
        let mut buf = Vec::new();
        write_u8_prefixed(&mut buf, b"hello").unwrap();
        let decoded = read_u8_prefixed(&buf[..]).unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn list_round_trip() {
        let items: Vec<u32> = vec![1, 2, 3];
        let mut buf = Vec::new();
        write_list(&mut buf, &items).unwrap();
        let decoded: Vec<u32> = read_list(&buf[..]).unwrap();
        assert_eq!(decoded, items);
    }
}
