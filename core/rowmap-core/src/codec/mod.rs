//! Byte codecs.
//!
//! Three codecs live here and must not be conflated:
//!
//! - [`binary`]: compact structured-record encoding with written/read schema
//!   resolution (the delegate for every non-packed column value).
//! - [`column`]: packed big-endian ints/longs and raw UTF-8 strings for
//!   single column values; delegates everything else to [`binary`].
//! - [`ordered`]: order-preserving encoding for row keys: unsigned
//!   lexicographic comparison of encodings equals value ordering.

pub mod binary;
pub mod column;
pub mod ordered;

pub use binary::{BinaryCodec, RecordCodec};
pub use column::ColumnCodec;

use crate::error::{MappingError, MappingResult};

/// Forward-only cursor over an input buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> MappingResult<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| MappingError::serialization(format!("unexpected end of input at byte {}", self.pos)))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_exact(&mut self, len: usize) -> MappingResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(MappingError::serialization(format!(
                "need {len} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> MappingResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    /// Fails unless every byte was consumed.
    pub fn finish(&self) -> MappingResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(MappingError::serialization(format!(
                "{} trailing bytes after offset {}",
                self.remaining(),
                self.pos
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_bounds() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_array::<2>().unwrap(), [2, 3]);
        assert!(reader.read_u8().is_err());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_reader_trailing() {
        let mut reader = ByteReader::new(&[1, 2]);
        reader.read_u8().unwrap();
        assert!(reader.finish().unwrap_err().to_string().contains("1 trailing bytes"));
        assert!(reader.read_exact(5).is_err());
    }
}
