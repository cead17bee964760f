//! Binary buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A forward-only reader over a byte slice.
///
/// Every read is bounds-checked: running past the end yields
/// [`BufferError::EndOfBuffer`] and leaves the cursor where it was.
///
/// # Example
///
/// ```
/// use msgpack_formatting_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.try_u8().unwrap(), 0x01);
/// assert_eq!(reader.try_u16().unwrap(), 0x0203);
/// assert!(reader.try_u8().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    uint8: &'a [u8],
    x: usize,
}

impl<'a> Reader<'a> {
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.x
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.uint8.len() - self.x
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    fn check(&self, needed: usize) -> Result<(), BufferError> {
        let remaining = self.remaining();
        if needed > remaining {
            Err(BufferError::EndOfBuffer { needed, remaining })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(out)
    }

    /// Peeks at the current byte without advancing.
    pub fn try_peek(&self) -> Result<u8, BufferError> {
        self.check(1)?;
        Ok(self.uint8[self.x])
    }

    #[inline]
    pub fn try_u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    #[inline]
    pub fn try_i8(&mut self) -> Result<i8, BufferError> {
        self.try_u8().map(|b| b as i8)
    }

    #[inline]
    pub fn try_u16(&mut self) -> Result<u16, BufferError> {
        self.array().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn try_i16(&mut self) -> Result<i16, BufferError> {
        self.array().map(i16::from_be_bytes)
    }

    #[inline]
    pub fn try_u32(&mut self) -> Result<u32, BufferError> {
        self.array().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn try_i32(&mut self) -> Result<i32, BufferError> {
        self.array().map(i32::from_be_bytes)
    }

    #[inline]
    pub fn try_u64(&mut self) -> Result<u64, BufferError> {
        self.array().map(u64::from_be_bytes)
    }

    #[inline]
    pub fn try_i64(&mut self) -> Result<i64, BufferError> {
        self.array().map(i64::from_be_bytes)
    }

    #[inline]
    pub fn try_f32(&mut self) -> Result<f32, BufferError> {
        self.array().map(f32::from_be_bytes)
    }

    #[inline]
    pub fn try_f64(&mut self) -> Result<f64, BufferError> {
        self.array().map(f64::from_be_bytes)
    }

    /// Borrows the next `size` bytes and advances past them.
    pub fn try_buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let start = self.x;
        self.x += size;
        Ok(&self.uint8[start..self.x])
    }

    /// Reads `size` bytes as UTF-8. The cursor does not move on failure.
    pub fn try_utf8(&mut self, size: usize) -> Result<&'a str, BufferError> {
        self.check(size)?;
        let start = self.x;
        let s = str::from_utf8(&self.uint8[start..start + size])
            .map_err(|_| BufferError::InvalidUtf8 { offset: start })?;
        self.x += size;
        Ok(s)
    }

    /// Copies the next `out.len()` bytes into `out`.
    pub fn try_copy_to(&mut self, out: &mut [u8]) -> Result<(), BufferError> {
        let src = self.try_buf(out.len())?;
        out.copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xff, 0xfe];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_u32().unwrap(), 0x01020304);
        assert_eq!(reader.try_i16().unwrap(), -2);
        assert!(reader.is_empty());
    }

    #[test]
    fn end_of_buffer_reports_shortfall_and_keeps_cursor() {
        let data = [0xcd, 0x01];
        let mut reader = Reader::new(&data);
        reader.try_u8().unwrap();
        assert_eq!(
            reader.try_u32(),
            Err(BufferError::EndOfBuffer {
                needed: 4,
                remaining: 1
            })
        );
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.try_u8().unwrap(), 0x01);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0x90];
        let reader = Reader::new(&data);
        assert_eq!(reader.try_peek().unwrap(), 0x90);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn utf8_rejects_invalid_sequences() {
        let data = [0xc3, 0x28];
        let mut reader = Reader::new(&data);
        assert_eq!(
            reader.try_utf8(2),
            Err(BufferError::InvalidUtf8 { offset: 0 })
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn floats_roundtrip_through_bytes() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&(-2.25f64).to_be_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(reader.try_f32().unwrap(), 1.5);
        assert_eq!(reader.try_f64().unwrap(), -2.25);
    }

    #[test]
    fn buf_borrows_without_copy() {
        let data = b"abcdef";
        let mut reader = Reader::new(data);
        assert_eq!(reader.try_buf(3).unwrap(), b"abc");
        let mut out = [0u8; 2];
        reader.try_copy_to(&mut out).unwrap();
        assert_eq!(&out, b"de");
        assert_eq!(reader.remaining(), 1);
    }
}
