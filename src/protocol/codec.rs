//! NSPI wire codec (reader/writer primitives)
//!
//! Every NSPI structure is serialized little-endian through [`WireWriter`]
//! and parsed back through [`WireReader`]. The reader never panics on short
//! input: every read is bounds-checked and reports the field it was reading.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Error, Result};

/// Structures that can be written to the wire.
pub trait WireEncode {
    /// Append the wire form of `self` to `writer`.
    fn encode_into(&self, writer: &mut WireWriter) -> Result<()>;
}

/// Structures that can be read from the wire.
pub trait WireDecode: Sized {
    /// Read one value from `reader`, advancing it.
    fn decode_from(reader: &mut WireReader<'_>) -> Result<Self>;
}

/// Encode a structure to bytes
///
/// # Errors
///
/// Returns an error if a count or length exceeds its protocol bound, or if a
/// string carries an embedded NUL.
pub fn encode<T: WireEncode + ?Sized>(value: &T) -> Result<Bytes> {
    let mut writer = WireWriter::new();
    value.encode_into(&mut writer)?;
    Ok(writer.finish())
}

/// Decode a structure from bytes, requiring the whole buffer to be consumed
pub fn decode<T: WireDecode>(bytes: &[u8]) -> Result<T> {
    let mut reader = WireReader::new(bytes);
    let value = T::decode_from(&mut reader)?;
    reader.finish("message")?;
    Ok(value)
}

/// Bounds-checked little-endian reader over a byte slice.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader over `buf`
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            total: buf.len(),
        }
    }

    /// Bytes left to read
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Bytes consumed so far
    #[must_use]
    pub fn position(&self) -> usize {
        self.total - self.buf.len()
    }

    /// Whether the reader is exhausted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Unread bytes, without consuming them
    #[must_use]
    pub fn peek(&self) -> &'a [u8] {
        self.buf
    }

    fn ensure(&self, needed: usize, field: &'static str) -> Result<()> {
        if self.buf.len() < needed {
            return Err(Error::BufferTooSmall {
                field,
                needed,
                got: self.buf.len(),
            });
        }
        Ok(())
    }

    /// Fail with [`Error::ShapeMismatch`] unless `count` elements of
    /// `element_size` bytes are available.
    pub fn ensure_elements(
        &self,
        count: usize,
        element_size: usize,
        field: &'static str,
    ) -> Result<()> {
        let available = self.buf.len() / element_size.max(1);
        if available < count {
            return Err(Error::ShapeMismatch {
                field,
                declared: count,
                available,
            });
        }
        Ok(())
    }

    /// Read one byte
    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(1, field)?;
        Ok(self.buf.get_u8())
    }

    /// Read a little-endian u16
    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        self.ensure(2, field)?;
        Ok(self.buf.get_u16_le())
    }

    /// Read a little-endian i16
    pub fn read_i16(&mut self, field: &'static str) -> Result<i16> {
        self.ensure(2, field)?;
        Ok(self.buf.get_i16_le())
    }

    /// Read a little-endian u32
    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(4, field)?;
        Ok(self.buf.get_u32_le())
    }

    /// Read a little-endian i32
    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(4, field)?;
        Ok(self.buf.get_i32_le())
    }

    /// Read a little-endian u64
    pub fn read_u64(&mut self, field: &'static str) -> Result<u64> {
        self.ensure(8, field)?;
        Ok(self.buf.get_u64_le())
    }

    /// Read a fixed-size byte array
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N]> {
        self.ensure(N, field)?;
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Borrow the next `len` bytes
    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<&'a [u8]> {
        self.ensure(len, field)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Read a u32 element count and check it against `max`
    pub fn read_count(&mut self, field: &'static str, max: usize) -> Result<usize> {
        let count = self.read_u32(field)? as usize;
        if count > max {
            return Err(Error::BoundsExceeded { field, count, max });
        }
        Ok(count)
    }

    /// Read a one-byte presence flag (`Has*` fields)
    pub fn read_presence(&mut self, field: &'static str) -> Result<bool> {
        Ok(self.read_u8(field)? != 0)
    }

    /// Read a unique-pointer referent (`0` means null)
    pub fn read_pointer(&mut self, field: &'static str) -> Result<bool> {
        Ok(self.read_u32(field)? != 0)
    }

    /// Read a NUL-terminated 8-bit string, returned without its terminator
    pub fn read_cstr8(&mut self, field: &'static str) -> Result<&'a [u8]> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::Unterminated { field })?;
        let (text, tail) = self.buf.split_at(end);
        self.buf = &tail[1..];
        Ok(text)
    }

    /// Read a NUL-terminated UTF-16LE string
    pub fn read_cstr16(&mut self, field: &'static str) -> Result<String> {
        let mut units = Vec::new();
        let mut offset = 0;
        loop {
            if offset + 2 > self.buf.len() {
                return Err(Error::Unterminated { field });
            }
            let unit = u16::from_le_bytes([self.buf[offset], self.buf[offset + 1]]);
            offset += 2;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        self.buf.advance(offset);
        String::from_utf16(&units).map_err(|_| Error::InvalidUtf16 { field })
    }

    /// Split off a u32-length-prefixed frame as its own reader
    pub fn read_frame(&mut self, field: &'static str) -> Result<WireReader<'a>> {
        let len = self.read_u32(field)? as usize;
        let body = self.read_bytes(len, field)?;
        Ok(WireReader::new(body))
    }

    /// Require the reader to be exhausted
    pub fn finish(&self, field: &'static str) -> Result<()> {
        if !self.buf.is_empty() {
            return Err(Error::TrailingBytes {
                field,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }
}

/// Little-endian writer backed by a growable buffer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with reserved capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Write one byte
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Write a little-endian u16
    pub fn put_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    /// Write a little-endian i16
    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    /// Write a little-endian u32
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    /// Write a little-endian i32
    pub fn put_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    /// Write a little-endian u64
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    /// Write raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write a u32 element count after checking it against `max`
    pub fn put_count(&mut self, count: usize, max: usize, field: &'static str) -> Result<()> {
        if count > max {
            return Err(Error::BoundsExceeded { field, count, max });
        }
        // max never exceeds u32 range for NSPI bounds
        self.put_u32(count as u32);
        Ok(())
    }

    /// Write a one-byte presence flag
    pub fn put_presence(&mut self, present: bool) {
        self.put_u8(if present { 0xFF } else { 0x00 });
    }

    /// Write a unique-pointer referent
    pub fn put_pointer(&mut self, present: bool) {
        self.put_u32(u32::from(present));
    }

    /// Write an 8-bit string followed by a NUL terminator
    pub fn put_cstr8(&mut self, text: &[u8], field: &'static str) -> Result<()> {
        if text.contains(&0) {
            return Err(Error::InteriorNul { field });
        }
        self.put_bytes(text);
        self.put_u8(0);
        Ok(())
    }

    /// Write a UTF-16LE string followed by a NUL terminator
    pub fn put_cstr16(&mut self, text: &str, field: &'static str) -> Result<()> {
        if text.contains('\0') {
            return Err(Error::InteriorNul { field });
        }
        for unit in text.encode_utf16() {
            self.put_u16(unit);
        }
        self.put_u16(0);
        Ok(())
    }

    /// Write a u32 length prefix followed by whatever `body` writes
    pub fn put_frame<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let start = self.buf.len();
        self.put_u32(0);
        body(self)?;
        let len = self.buf.len() - start - 4;
        let len = u32::try_from(len).map_err(|_| Error::BoundsExceeded {
            field: "frame",
            count: len,
            max: u32::MAX as usize,
        })?;
        self.buf[start..start + 4].copy_from_slice(&len.to_le_bytes());
        Ok(())
    }

    /// Freeze the written bytes
    #[must_use]
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_primitives_roundtrip() {
        let mut writer = WireWriter::new();
        writer.put_u8(0xAB);
        writer.put_u16(0x1234);
        writer.put_i32(-7);
        writer.put_u64(0x0102_0304_0506_0708);
        let bytes = writer.finish();

        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_u8("a").unwrap(), 0xAB);
        assert_eq!(reader.read_u16("b").unwrap(), 0x1234);
        assert_eq!(reader.read_i32("c").unwrap(), -7);
        assert_eq!(reader.read_u64("d").unwrap(), 0x0102_0304_0506_0708);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_short_read_names_field() {
        let mut reader = WireReader::new(&[1, 2]);
        let err = reader.read_u32("stat.sort_type").unwrap_err();
        assert_eq!(
            err,
            Error::BufferTooSmall {
                field: "stat.sort_type",
                needed: 4,
                got: 2
            }
        );
    }

    #[test]
    fn test_cstr8_requires_terminator() {
        let mut reader = WireReader::new(b"abc");
        assert_eq!(
            reader.read_cstr8("dn").unwrap_err(),
            Error::Unterminated { field: "dn" }
        );

        let mut reader = WireReader::new(b"abc\0rest");
        assert_eq!(reader.read_cstr8("dn").unwrap(), b"abc");
        assert_eq!(reader.peek(), b"rest");
    }

    #[test]
    fn test_cstr16_roundtrip_and_unterminated() {
        let mut writer = WireWriter::new();
        writer.put_cstr16("Zoë", "name").unwrap();
        let bytes = writer.finish();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_cstr16("name").unwrap(), "Zoë");
        assert!(reader.is_empty());

        let mut reader = WireReader::new(&[0x41, 0x00, 0x42]);
        assert!(matches!(
            reader.read_cstr16("name"),
            Err(Error::Unterminated { .. })
        ));
    }

    #[test]
    fn test_interior_nul_rejected() {
        let mut writer = WireWriter::new();
        assert!(matches!(
            writer.put_cstr8(b"a\0b", "s"),
            Err(Error::InteriorNul { .. })
        ));
        assert!(matches!(
            writer.put_cstr16("a\0b", "s"),
            Err(Error::InteriorNul { .. })
        ));
    }

    #[test]
    fn test_frame_length_patched() {
        let mut writer = WireWriter::new();
        writer
            .put_frame(|w| {
                w.put_u32(9);
                w.put_u16(1);
                Ok(())
            })
            .unwrap();
        let bytes = writer.finish();
        assert_eq!(&bytes[0..4], &6u32.to_le_bytes());

        let mut reader = WireReader::new(&bytes);
        let mut frame = reader.read_frame("value").unwrap();
        assert_eq!(frame.read_u32("x").unwrap(), 9);
        assert_eq!(frame.read_u16("y").unwrap(), 1);
        frame.finish("value").unwrap();
    }

    #[test]
    fn test_count_bounds() {
        let mut writer = WireWriter::new();
        assert!(matches!(
            writer.put_count(11, 10, "rows"),
            Err(Error::BoundsExceeded { count: 11, max: 10, .. })
        ));

        let bytes = 11u32.to_le_bytes();
        let mut reader = WireReader::new(&bytes);
        assert!(matches!(
            reader.read_count("rows", 10),
            Err(Error::BoundsExceeded { count: 11, .. })
        ));
    }

    #[test]
    fn test_ensure_elements_reports_available() {
        let reader = WireReader::new(&[0u8; 8]);
        assert_eq!(
            reader.ensure_elements(3, 4, "tags").unwrap_err(),
            Error::ShapeMismatch {
                field: "tags",
                declared: 3,
                available: 2
            }
        );
    }
}
