//! Dynamic values carried in Jet payloads.

use std::fmt;

use super::{tag, BinaryReader, BinaryWriter, Decode, Encode};
use crate::core::CodecError;

/// Identifier of a payload field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    /// Textual field name. Must not be blank.
    Name(String),
    /// Numeric field identifier.
    Index(i64),
    /// Opaque symbolic identifier, distinct from any name with the same text.
    Symbol(String),
}

impl FieldKey {
    /// Create a symbolic key.
    pub fn symbol(id: impl Into<String>) -> Self {
        Self::Symbol(id.into())
    }

    /// Get the name if this is a textual key.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Check if the key is acceptable as a payload field.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Name(name) => !name.trim().is_empty(),
            Self::Index(_) | Self::Symbol(_) => true,
        }
    }

    /// Name of the key kind, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Index(_) => "index",
            Self::Symbol(_) => "symbol",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(index) => write!(f, "{index}"),
            Self::Symbol(id) => write!(f, "Symbol({id})"),
        }
    }
}

impl From<&str> for FieldKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for FieldKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<i64> for FieldKey {
    fn from(index: i64) -> Self {
        Self::Index(index)
    }
}

impl From<i32> for FieldKey {
    fn from(index: i32) -> Self {
        Self::Index(i64::from(index))
    }
}

impl Encode for FieldKey {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        match self {
            Self::Name(name) => writer.write_text(name),
            Self::Index(index) => {
                writer.write_int(*index);
                Ok(())
            }
            Self::Symbol(id) => writer.write_symbol(id),
        }
    }
}

impl Decode for FieldKey {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        match reader.peek_tag()? {
            tag::TEXT => reader.read_text().map(Self::Name),
            tag::INT => reader.read_int().map(Self::Index),
            tag::SYMBOL => reader.read_symbol().map(Self::Symbol),
            found => Err(CodecError::UnexpectedTag {
                expected: "field key",
                found,
            }),
        }
    }
}

/// A dynamically typed payload value.
///
/// `Map` keeps insertion order and plays the role of a plain object.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered list.
    List(Vec<Value>),
    /// Ordered object.
    Map(Vec<(FieldKey, Value)>),
}

impl Value {
    /// Build an object from key/value pairs, preserving their order.
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<FieldKey>,
        V: Into<Value>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check if this is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    /// Get the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the text if this is a `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Get the bytes if this is a `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a field of an object.
    pub fn get(&self, key: &FieldKey) -> Option<&Value> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    fn decode_nested(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        match reader.peek_tag()? {
            tag::NULL => reader.read_null().map(|_| Self::Null),
            tag::FALSE | tag::TRUE => reader.read_bool().map(Self::Bool),
            tag::INT => reader.read_int().map(Self::Int),
            tag::FLOAT => reader.read_float().map(Self::Float),
            tag::TEXT => reader.read_text().map(Self::Text),
            tag::BYTES => reader.read_bytes().map(Self::Bytes),
            tag::LIST => {
                let count = reader.read_list_len()?;
                reader.enter()?;
                // Each element needs at least one byte.
                let mut items = Vec::with_capacity(count.min(reader.remaining()));
                for _ in 0..count {
                    items.push(Self::decode_nested(reader)?);
                }
                reader.leave();
                Ok(Self::List(items))
            }
            tag::MAP => {
                let count = reader.read_map_len()?;
                reader.enter()?;
                let mut entries = Vec::with_capacity(count.min(reader.remaining() / 2));
                for _ in 0..count {
                    let key = FieldKey::decode(reader)?;
                    let value = Self::decode_nested(reader)?;
                    entries.push((key, value));
                }
                reader.leave();
                Ok(Self::Map(entries))
            }
            tag::SYMBOL => Err(CodecError::UnexpectedTag {
                expected: "value",
                found: tag::SYMBOL,
            }),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

impl Encode for Value {
    fn encode(&self, writer: &mut BinaryWriter) -> Result<(), CodecError> {
        match self {
            Self::Null => writer.write_null(),
            Self::Bool(v) => writer.write_bool(*v),
            Self::Int(v) => writer.write_int(*v),
            Self::Float(v) => writer.write_float(*v),
            Self::Text(v) => writer.write_text(v)?,
            Self::Bytes(v) => writer.write_bytes(v)?,
            Self::List(items) => {
                writer.begin_list(items.len())?;
                for item in items {
                    item.encode(writer)?;
                }
            }
            Self::Map(entries) => {
                writer.begin_map(entries.len())?;
                for (key, value) in entries {
                    key.encode(writer)?;
                    value.encode(writer)?;
                }
            }
        }
        Ok(())
    }
}

impl Decode for Value {
    fn decode(reader: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        Self::decode_nested(reader)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{deserialize, serialize};

    fn roundtrip(value: &Value) -> Value {
        let mut writer = BinaryWriter::new();
        serialize(&mut writer, value).unwrap();
        let bytes = writer.drain();
        let mut reader = BinaryReader::new(&bytes);
        let decoded = deserialize::<Value>(&mut reader).unwrap();
        assert!(reader.is_empty());
        decoded
    }

    #[test]
    fn test_nested_object_roundtrip() {
        let value = Value::object([
            ("name", Value::from("jet")),
            ("ratio", Value::from(0.5)),
            (
                "tags",
                Value::from(vec![Value::from(1), Value::Null, Value::from(true)]),
            ),
            ("raw", Value::from(vec![0u8, 1, 2])),
        ]);

        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_map_keeps_key_kinds_and_order() {
        let value = Value::Map(vec![
            (FieldKey::from("b"), Value::from(1)),
            (FieldKey::from(7), Value::from(2)),
            (FieldKey::symbol("b"), Value::from(3)),
        ]);

        let Value::Map(entries) = roundtrip(&value) else {
            panic!("expected map");
        };
        let keys: Vec<_> = entries.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![FieldKey::from("b"), FieldKey::Index(7), FieldKey::symbol("b")]
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut value = Value::Null;
        for _ in 0..=crate::codec::MAX_DEPTH {
            value = Value::List(vec![value]);
        }

        let mut writer = BinaryWriter::new();
        serialize(&mut writer, &value).unwrap();
        let bytes = writer.drain();

        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(
            deserialize::<Value>(&mut reader),
            Err(CodecError::DepthExceeded)
        );
    }

    #[test]
    fn test_unknown_tag() {
        let mut reader = BinaryReader::new(&[0xEE]);
        assert_eq!(
            deserialize::<Value>(&mut reader),
            Err(CodecError::UnknownTag(0xEE))
        );
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        // Claims 2^32-1 items but carries none.
        let bytes = [tag::LIST, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = BinaryReader::new(&bytes);
        assert_eq!(
            deserialize::<Value>(&mut reader),
            Err(CodecError::UnexpectedEof)
        );
    }

    #[test]
    fn test_field_key_validity() {
        assert!(FieldKey::from("a").is_valid());
        assert!(!FieldKey::from("   ").is_valid());
        assert!(!FieldKey::from("").is_valid());
        assert!(FieldKey::Index(-1).is_valid());
        assert!(FieldKey::symbol("").is_valid());
    }
}
