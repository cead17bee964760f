//! Binary buffer writer with auto-growing capacity.

/// An append-only binary writer.
///
/// All multi-byte values are written big-endian, which is what MessagePack
/// puts on the wire.
///
/// # Example
///
/// ```
/// use msgpack_formatting_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x01);
/// writer.u16(0x0203);
/// let data = writer.flush();
/// assert_eq!(data, [0x01, 0x02, 0x03]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct Writer {
    uint8: Vec<u8>,
}

impl Writer {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a writer that can hold `capacity` bytes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            uint8: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.uint8.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uint8.is_empty()
    }

    /// Current cursor position, usable with [`Writer::rollback`].
    pub fn mark(&self) -> usize {
        self.uint8.len()
    }

    /// Discards everything written after `mark`.
    pub fn rollback(&mut self, mark: usize) {
        self.uint8.truncate(mark);
    }

    /// Pending bytes without consuming them.
    pub fn as_slice(&self) -> &[u8] {
        &self.uint8
    }

    /// Drops pending bytes but keeps the allocation.
    pub fn clear(&mut self) {
        self.uint8.clear();
    }

    /// Returns the written data and starts over, keeping the allocation.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.uint8.clone();
        self.uint8.clear();
        out
    }

    /// Ensures at least `capacity` more bytes fit without reallocating.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.uint8.reserve(capacity);
    }

    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.uint8.push(val);
    }

    #[inline]
    pub fn i8(&mut self, val: i8) {
        self.uint8.push(val as u8);
    }

    #[inline]
    pub fn u16(&mut self, val: u16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i16(&mut self, val: i16) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u32(&mut self, val: u32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i32(&mut self, val: i32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn u64(&mut self, val: u64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn i64(&mut self, val: i64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f32(&mut self, val: f32) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    #[inline]
    pub fn f64(&mut self, val: f64) {
        self.uint8.extend_from_slice(&val.to_be_bytes());
    }

    /// Writes a tag byte followed by a big-endian u16.
    pub fn u8u16(&mut self, tag: u8, val: u16) {
        self.ensure_capacity(3);
        self.u8(tag);
        self.u16(val);
    }

    /// Writes a tag byte followed by a big-endian u32.
    pub fn u8u32(&mut self, tag: u8, val: u32) {
        self.ensure_capacity(5);
        self.u8(tag);
        self.u32(val);
    }

    /// Writes a tag byte followed by a big-endian u64.
    pub fn u8u64(&mut self, tag: u8, val: u64) {
        self.ensure_capacity(9);
        self.u8(tag);
        self.u64(val);
    }

    /// Writes a tag byte followed by a big-endian f32.
    pub fn u8f32(&mut self, tag: u8, val: f32) {
        self.ensure_capacity(5);
        self.u8(tag);
        self.f32(val);
    }

    /// Writes a tag byte followed by a big-endian f64.
    pub fn u8f64(&mut self, tag: u8, val: f64) {
        self.ensure_capacity(9);
        self.u8(tag);
        self.f64(val);
    }

    /// Writes a byte slice.
    pub fn buf(&mut self, buf: &[u8]) {
        self.uint8.extend_from_slice(buf);
    }

    /// Writes the UTF-8 bytes of `s`. Returns the number of bytes written.
    pub fn utf8(&mut self, s: &str) -> usize {
        self.uint8.extend_from_slice(s.as_bytes());
        s.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_u16() {
        let mut writer = Writer::new();
        writer.u16(0x0102);
        assert_eq!(writer.flush(), [0x01, 0x02]);
    }

    #[test]
    fn test_u32() {
        let mut writer = Writer::new();
        writer.u32(0x01020304);
        assert_eq!(writer.flush(), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_tagged_writes() {
        let mut writer = Writer::new();
        writer.u8u16(0xcd, 0x0100);
        writer.u8u32(0xce, 1);
        assert_eq!(
            writer.flush(),
            [0xcd, 0x01, 0x00, 0xce, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_f64_is_big_endian() {
        let mut writer = Writer::new();
        writer.u8f64(0xcb, 1.0);
        assert_eq!(
            writer.flush(),
            [0xcb, 0x3f, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_i8_negative() {
        let mut writer = Writer::new();
        writer.i8(-1i8);
        assert_eq!(writer.flush(), [0xff]);
    }

    #[test]
    fn test_i64_roundtrip() {
        let mut writer = Writer::new();
        writer.i64(-9_999_999_999i64);
        let data = writer.flush();
        assert_eq!(data.len(), 8);
        assert_eq!(
            i64::from_be_bytes(data.try_into().unwrap()),
            -9_999_999_999i64
        );
    }

    #[test]
    fn test_flush_multiple() {
        let mut writer = Writer::new();
        writer.u8(0x01);
        assert_eq!(writer.flush(), [0x01]);
        writer.u8(0x02);
        assert_eq!(writer.flush(), [0x02]);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_rollback_discards_tail() {
        let mut writer = Writer::new();
        writer.u8(0x91);
        let mark = writer.mark();
        writer.utf8("partial");
        writer.rollback(mark);
        assert_eq!(writer.as_slice(), [0x91]);
    }

    #[test]
    fn test_utf8_counts_bytes() {
        let mut writer = Writer::new();
        let n = writer.utf8("café");
        let data = writer.flush();
        assert_eq!(n, 5);
        assert_eq!(std::str::from_utf8(&data).unwrap(), "café");
    }
}
