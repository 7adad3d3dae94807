//! Type-tagged binary codec.
//!
//! Every value is written as a one-byte type tag followed by its body.
//! Lengths and counts are big-endian `u32` prefixes.
//!
//! ```text
//! +------+-----------------------------------------------+
//! | Tag  | Body                                          |
//! +------+-----------------------------------------------+
//! | 0x00 | null (empty)                                  |
//! | 0x01 | false (empty)                                 |
//! | 0x02 | true (empty)                                  |
//! | 0x03 | i64, 8 bytes BE                               |
//! | 0x04 | f64, 8 bytes BE bit pattern                   |
//! | 0x05 | text: len (BE32) + UTF-8                      |
//! | 0x06 | bytes: len (BE32) + raw                       |
//! | 0x07 | list: count (BE32) + values                   |
//! | 0x08 | map: count (BE32) + (key, value) pairs        |
//! | 0x09 | symbol: len (BE32) + UTF-8                    |
//! +------+-----------------------------------------------+
//! ```
//!
//! The envelope writes its frame fields with [`serialize`] in a fixed order
//! and reads them back with [`deserialize`] in the same order.

mod value;

pub use value::{FieldKey, Value};

use crate::core::CodecError;

/// Type tags.
pub mod tag {
    /// Null.
    pub const NULL: u8 = 0x00;
    /// Boolean false.
    pub const FALSE: u8 = 0x01;
    /// Boolean true.
    pub const TRUE: u8 = 0x02;
    /// Signed 64-bit integer.
    pub const INT: u8 = 0x03;
    /// 64-bit float.
    pub const FLOAT: u8 = 0x04;
    /// UTF-8 text.
    pub const TEXT: u8 = 0x05;
    /// Raw byte sequence.
    pub const BYTES: u8 = 0x06;
    /// Heterogeneous list.
    pub const LIST: u8 = 0x07;
    /// Ordered map.
    pub const MAP: u8 = 0x08;
    /// Opaque symbolic identifier.
    pub const SYMBOL: u8 = 0x09;
}

/// Maximum nesting of lists and maps accepted by the reader.
pub const MAX_DEPTH: usize = 64;

/// A value that can be written with the binary codec.
pub trait Encode {
    /// Write `self` to the writer.
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError>;
}

/// A value that can be read back with the binary codec.
pub trait Decode: Sized {
    /// Read a value from the reader.
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError>;
}

/// Write a value.
pub fn serialize<T: Encode + ?Sized>(
    writer: &mut BinaryWriter,
    value: &T,
) -> Result<(), CodecError> {
    value.encode(writer)
}

/// Read a value.
pub fn deserialize<T: Decode>(reader: &mut BinaryReader<'_>) -> Result<T, CodecError> {
    T::decode(reader)
}

/// Growable output buffer for tagged values.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the written bytes, leaving the writer empty.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Write a null.
    pub fn write_null(&mut self) {
        self.buf.push(tag::NULL);
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(if value { tag::TRUE } else { tag::FALSE });
    }

    /// Write a signed integer.
    pub fn write_int(&mut self, value: i64) {
        self.buf.push(tag::INT);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a float.
    pub fn write_float(&mut self, value: f64) {
        self.buf.push(tag::FLOAT);
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    /// Write UTF-8 text.
    pub fn write_text(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_prefixed(tag::TEXT, value.as_bytes())
    }

    /// Write a raw byte sequence.
    pub fn write_bytes(&mut self, value: &[u8]) -> Result<(), CodecError> {
        self.write_prefixed(tag::BYTES, value)
    }

    /// Write a symbolic identifier.
    pub fn write_symbol(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_prefixed(tag::SYMBOL, value.as_bytes())
    }

    /// Start a list of `count` values. The caller writes the values next.
    pub fn begin_list(&mut self, count: usize) -> Result<(), CodecError> {
        self.buf.push(tag::LIST);
        self.write_len(count)
    }

    /// Start a map of `count` pairs. The caller writes key, value pairs next.
    pub fn begin_map(&mut self, count: usize) -> Result<(), CodecError> {
        self.buf.push(tag::MAP);
        self.write_len(count)
    }

    fn write_prefixed(&mut self, tag: u8, body: &[u8]) -> Result<(), CodecError> {
        self.buf.push(tag);
        self.write_len(body.len())?;
        self.buf.extend_from_slice(body);
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        self.buf.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }
}

/// Cursor over tagged input.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    /// Current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether all input has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next tag without consuming it.
    pub fn peek_tag(&self) -> Result<u8, CodecError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(CodecError::UnexpectedEof)
    }

    /// Read a null.
    pub fn read_null(&mut self) -> Result<(), CodecError> {
        self.expect_tag(tag::NULL, "null")
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_tag()? {
            tag::TRUE => Ok(true),
            tag::FALSE => Ok(false),
            found => Err(CodecError::UnexpectedTag {
                expected: "bool",
                found,
            }),
        }
    }

    /// Read a signed integer.
    pub fn read_int(&mut self) -> Result<i64, CodecError> {
        self.expect_tag(tag::INT, "int")?;
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    /// Read a float.
    pub fn read_float(&mut self) -> Result<f64, CodecError> {
        self.expect_tag(tag::FLOAT, "float")?;
        Ok(f64::from_bits(u64::from_be_bytes(self.take_array()?)))
    }

    /// Read UTF-8 text.
    pub fn read_text(&mut self) -> Result<String, CodecError> {
        self.expect_tag(tag::TEXT, "text")?;
        self.read_utf8()
    }

    /// Read a raw byte sequence.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        self.expect_tag(tag::BYTES, "bytes")?;
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a symbolic identifier.
    pub fn read_symbol(&mut self) -> Result<String, CodecError> {
        self.expect_tag(tag::SYMBOL, "symbol")?;
        self.read_utf8()
    }

    /// Read a list header and return its element count.
    pub fn read_list_len(&mut self) -> Result<usize, CodecError> {
        self.expect_tag(tag::LIST, "list")?;
        self.read_len()
    }

    /// Read a map header and return its pair count.
    pub fn read_map_len(&mut self) -> Result<usize, CodecError> {
        self.expect_tag(tag::MAP, "map")?;
        self.read_len()
    }

    /// Enter a nested list or map.
    pub fn enter(&mut self) -> Result<(), CodecError> {
        if self.depth >= MAX_DEPTH {
            return Err(CodecError::DepthExceeded);
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a nested list or map.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn read_tag(&mut self) -> Result<u8, CodecError> {
        let tag = self.peek_tag()?;
        self.pos += 1;
        Ok(tag)
    }

    fn expect_tag(&mut self, expected_tag: u8, expected: &'static str) -> Result<(), CodecError> {
        let found = self.peek_tag()?;
        if found != expected_tag {
            return Err(CodecError::UnexpectedTag { expected, found });
        }
        self.pos += 1;
        Ok(())
    }

    fn read_utf8(&mut self) -> Result<String, CodecError> {
        let len = self.read_len()?;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_len(&mut self) -> Result<usize, CodecError> {
        Ok(u32::from_be_bytes(self.take_array()?) as usize)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < len {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

impl Encode for bool {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_bool(*self);
        Ok(())
    }
}

impl Decode for bool {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        reader.read_bool()
    }
}

impl Encode for i64 {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_int(*self);
        Ok(())
    }
}

impl Decode for i64 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        reader.read_int()
    }
}

impl Encode for u8 {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_int(i64::from(*self));
        Ok(())
    }
}

impl Decode for u8 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        let value = reader.read_int()?;
        u8::try_from(value).map_err(|_| CodecError::OutOfRange(value))
    }
}

impl Encode for f64 {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_float(*self);
        Ok(())
    }
}

impl Decode for f64 {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        reader.read_float()
    }
}

impl Encode for str {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_text(self)
    }
}

impl Encode for String {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_text(self)
    }
}

impl Decode for String {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        reader.read_text()
    }
}

impl Encode for [u8] {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_bytes(self)
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        writer.write_bytes(self)
    }
}

impl Decode for Vec<u8> {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        reader.read_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_layout() {
        let mut writer = BinaryWriter::new();
        serialize(&mut writer, &42i64).unwrap();

        let bytes = writer.drain();
        assert_eq!(bytes, [tag::INT, 0, 0, 0, 0, 0, 0, 0, 42]);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_bytes_layout() {
        let mut writer = BinaryWriter::new();
        serialize(&mut writer, &[0xAAu8, 0xBB][..]).unwrap();

        assert_eq!(writer.drain(), [tag::BYTES, 0, 0, 0, 2, 0xAA, 0xBB]);
    }

    #[test]
    fn test_fields_read_in_sequence() {
        let mut writer = BinaryWriter::new();
        serialize(&mut writer, &b"magic"[..]).unwrap();
        serialize(&mut writer, "v1").unwrap();
        serialize(&mut writer, &1u8).unwrap();
        serialize(&mut writer, &true).unwrap();
        let bytes = writer.drain();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(deserialize::<Vec<u8>>(&mut reader).unwrap(), b"magic");
        assert_eq!(deserialize::<String>(&mut reader).unwrap(), "v1");
        assert_eq!(deserialize::<u8>(&mut reader).unwrap(), 1);
        assert!(deserialize::<bool>(&mut reader).unwrap());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_input() {
        let bytes = [tag::BYTES, 0, 0, 0, 10, 1, 2];
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(
            deserialize::<Vec<u8>>(&mut reader),
            Err(CodecError::UnexpectedEof)
        );

        let mut empty = BinaryReader::new(&[]);
        assert_eq!(deserialize::<i64>(&mut empty), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn test_wrong_tag() {
        let bytes = [tag::TRUE];
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(
            deserialize::<i64>(&mut reader),
            Err(CodecError::UnexpectedTag {
                expected: "int",
                found: tag::TRUE
            })
        );
        // Failed reads do not consume the tag.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_u8_out_of_range() {
        let mut writer = BinaryWriter::new();
        writer.write_int(300);
        let bytes = writer.drain();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(deserialize::<u8>(&mut reader), Err(CodecError::OutOfRange(300)));
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [tag::TEXT, 0, 0, 0, 2, 0xC3, 0x28];
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(deserialize::<String>(&mut reader), Err(CodecError::InvalidUtf8));
    }
}
