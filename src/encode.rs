//! Wire-format primitives
//!
//! Every field of a transaction falls in one of three categories: fixed-width
//! little-endian integers, compact-size counts and length-prefixed byte
//! strings. The writers here never fail, the [`Decoder`] reports malformed
//! input as a [`SerializationError`].

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializationError {
    UnexpectedEof { needed: usize, remaining: usize },
    NonCanonicalCompactSize(u64),
    OversizedLength(u64),
    InvalidWitnessFlag(u8),
    SuperfluousWitness,
    TrailingBytes(usize),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SerializationError::UnexpectedEof { needed, remaining } => write!(
                f,
                "unexpected end of data: needed {} bytes, {} remaining",
                needed, remaining
            ),
            SerializationError::NonCanonicalCompactSize(value) => {
                write!(f, "non-canonical compact size encoding of {}", value)
            }
            SerializationError::OversizedLength(len) => {
                write!(f, "length prefix {} exceeds the available data", len)
            }
            SerializationError::InvalidWitnessFlag(flag) => {
                write!(f, "invalid segwit flag byte 0x{:02x}", flag)
            }
            SerializationError::SuperfluousWitness => {
                write!(f, "witness flag set but no input carries witness data")
            }
            SerializationError::TrailingBytes(count) => {
                write!(f, "{} trailing bytes after transaction", count)
            }
        }
    }
}

impl std::error::Error for SerializationError {}

pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn write_u64_le(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Bitcoin's variable-length integer ("compact size")
pub fn write_compact_size(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

pub fn compact_size_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Compact-size length followed by the bytes themselves
pub fn write_var_bytes(out: &mut Vec<u8>, data: &[u8]) {
    write_compact_size(out, data.len() as u64);
    out.extend_from_slice(data);
}

/// Cursor over a byte slice
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder { data, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn peek_u8(&self) -> Result<u8, SerializationError> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(SerializationError::UnexpectedEof {
                needed: 1,
                remaining: 0,
            })
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], SerializationError> {
        if self.remaining() < len {
            return Err(SerializationError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }

        let slice = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SerializationError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_slice(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8, SerializationError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16, SerializationError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, SerializationError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, SerializationError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a compact size, rejecting encodings that are not the shortest form
    pub fn read_compact_size(&mut self) -> Result<u64, SerializationError> {
        let (value, minimum) = match self.read_u8()? {
            0xfd => (self.read_u16_le()? as u64, 0xfd),
            0xfe => (self.read_u32_le()? as u64, 0x1_0000),
            0xff => (self.read_u64_le()?, 0x1_0000_0000),
            small => return Ok(small as u64),
        };

        if value < minimum {
            return Err(SerializationError::NonCanonicalCompactSize(value));
        }
        Ok(value)
    }

    /// Reads a count of items that are each at least `min_item_size` bytes long.
    /// Counts that could not possibly fit in the remaining data are rejected
    /// before anything gets allocated.
    pub fn read_count(&mut self, min_item_size: usize) -> Result<usize, SerializationError> {
        let count = self.read_compact_size()?;
        let max = (self.remaining() / min_item_size.max(1)) as u64;
        if count > max {
            return Err(SerializationError::OversizedLength(count));
        }
        Ok(count as usize)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>, SerializationError> {
        let len = self.read_compact_size()?;
        if len > self.remaining() as u64 {
            return Err(SerializationError::OversizedLength(len));
        }
        Ok(self.read_slice(len as usize)?.to_vec())
    }

    pub fn finish(self) -> Result<(), SerializationError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(SerializationError::TrailingBytes(extra)),
        }
    }
}
