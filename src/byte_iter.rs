//! Primitive big/little-endian integer decoding from an arbitrary byte
//! slice, with explicit cursor tracking.
//!
//! This generalizes the teacher crate's `ByteIter` (an extension trait over
//! `Iterator<Item = u8>`) into a slice-backed cursor: several callers need to
//! know exactly how many bytes were consumed (the nvlist scanner's
//! `encoded_size` bookkeeping, the dnode reader's fixed-size reads), which a
//! bare iterator doesn't expose without an external counter.

use crate::error::{Error, Result};

fn eof() -> Error {
    Error::Io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof))
}

/// Byte order negotiated once (for the nvlist header) and carried through
/// the rest of that nvlist's parse. Every other on-disk structure in this
/// crate is fixed little-endian and uses the `_le` methods directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

/// A read-only cursor over a byte slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(eof());
        }
        let chunk = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(chunk)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(eof());
        }
        self.pos += n;
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_i16_be(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_bytes(2)?.try_into().unwrap()))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_i32_be(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_bytes(4)?.try_into().unwrap()))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    pub fn read_i64_be(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_bytes(8)?.try_into().unwrap()))
    }

    /// Round `n` up to the next multiple of 4 and skip the padding, per the
    /// nvlist 4-byte alignment rule.
    pub fn align4_skip(&mut self, n: usize) -> Result<()> {
        let padded = align_up(n, 4);
        self.skip(padded - n)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> Result<u16> {
        match order {
            ByteOrder::Little => self.read_u16_le(),
            ByteOrder::Big => self.read_u16_be(),
        }
    }

    pub fn read_i16(&mut self, order: ByteOrder) -> Result<i16> {
        match order {
            ByteOrder::Little => self.read_i16_le(),
            ByteOrder::Big => self.read_i16_be(),
        }
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> Result<u32> {
        match order {
            ByteOrder::Little => self.read_u32_le(),
            ByteOrder::Big => self.read_u32_be(),
        }
    }

    pub fn read_i32(&mut self, order: ByteOrder) -> Result<i32> {
        match order {
            ByteOrder::Little => self.read_i32_le(),
            ByteOrder::Big => self.read_i32_be(),
        }
    }

    pub fn read_u64(&mut self, order: ByteOrder) -> Result<u64> {
        match order {
            ByteOrder::Little => self.read_u64_le(),
            ByteOrder::Big => self.read_u64_be(),
        }
    }

    pub fn read_i64(&mut self, order: ByteOrder) -> Result<i64> {
        match order {
            ByteOrder::Little => self.read_i64_le(),
            ByteOrder::Big => self.read_i64_be(),
        }
    }
}

pub const fn align_up(n: usize, alignment: usize) -> usize {
    (n + alignment - 1) / alignment * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_multiple_of_four() {
        assert_eq!(align_up(0, 4), 0);
        assert_eq!(align_up(1, 4), 4);
        assert_eq!(align_up(4, 4), 4);
        assert_eq!(align_up(5, 4), 8);
    }

    #[test]
    fn reads_primitives_in_both_orders() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u32_be().unwrap(), 0x01020304);

        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u32_le().unwrap(), 0x04030201);
    }

    #[test]
    fn short_read_is_eof() {
        let data = [0x01];
        let mut c = Cursor::new(&data);
        assert!(c.read_u32_le().is_err());
    }

    #[test]
    fn position_and_remaining_track_consumption() {
        let data = [0u8; 10];
        let mut c = Cursor::new(&data);
        c.skip(3).unwrap();
        assert_eq!(c.position(), 3);
        assert_eq!(c.remaining(), 7);
    }
}
