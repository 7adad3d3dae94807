//! Ordered payload container.
//!
//! A [`Payload`] is an ordered list of `(field, value)` entries, unique by
//! field. Every mutation bumps a revision counter; iterators remember the
//! revision they started at and fail with
//! [`JetError::ConcurrentModification`] if it moves underneath them.
//!
//! A payload holding the single reserved field `"$payload"` is a *literal*:
//! it revives to the bare value instead of an object.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::codec::{BinaryReader, BinaryWriter, Decode, Encode, FieldKey, Value};
use crate::core::{JetError, Result, LITERAL_FIELD};

/// A single payload entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadEntry {
    /// Entry field.
    pub field: FieldKey,
    /// Entry value.
    pub value: Value,
}

impl PayloadEntry {
    /// Create an entry.
    pub fn new(field: impl Into<FieldKey>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl<K: Into<FieldKey>, V: Into<Value>> From<(K, V)> for PayloadEntry {
    fn from((field, value): (K, V)) -> Self {
        Self::new(field, value)
    }
}

#[derive(Debug, Default)]
struct Entries {
    list: Vec<PayloadEntry>,
    revision: u64,
}

impl Entries {
    fn position(&self, field: &FieldKey) -> Option<usize> {
        self.list.iter().position(|e| &e.field == field)
    }

    fn upsert(&mut self, entry: PayloadEntry) {
        match self.position(&entry.field) {
            Some(i) => self.list[i].value = entry.value,
            None => self.list.push(entry),
        }
        self.revision += 1;
    }
}

/// Ordered, mutable collection of payload entries.
pub struct Payload {
    shared: Arc<Mutex<Entries>>,
}

impl Payload {
    /// Create an empty payload.
    pub fn empty() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Entries::default())),
        }
    }

    /// Create a payload from entries.
    ///
    /// Every field is validated. A repeated field updates the earlier entry
    /// in place.
    pub fn new(entries: impl IntoIterator<Item = PayloadEntry>) -> Result<Self> {
        let mut inner = Entries::default();
        for entry in entries {
            ensure_field(&entry.field)?;
            inner.upsert(entry);
        }
        inner.revision = 0;
        Ok(Self {
            shared: Arc::new(Mutex::new(inner)),
        })
    }

    /// Wrap an object value into ordered entries.
    ///
    /// Non-object values are wrapped with [`Payload::literal`].
    pub fn object(value: Value) -> Result<Self> {
        match value {
            Value::Map(entries) => {
                Self::new(entries.into_iter().map(|(k, v)| PayloadEntry::new(k, v)))
            }
            other => Ok(Self::literal(other)),
        }
    }

    /// Wrap any value under the reserved literal field.
    pub fn literal(value: impl Into<Value>) -> Self {
        let inner = Entries {
            list: vec![PayloadEntry::new(LITERAL_FIELD, value)],
            revision: 0,
        };
        Self {
            shared: Arc::new(Mutex::new(inner)),
        }
    }

    /// Convert entries back to a value.
    ///
    /// A single literal entry yields its raw value; anything else an object.
    pub fn revive(entries: Vec<PayloadEntry>) -> Value {
        if is_literal(&entries) {
            return entries
                .into_iter()
                .next()
                .map(|e| e.value)
                .unwrap_or_default();
        }
        Value::Map(entries.into_iter().map(|e| (e.field, e.value)).collect())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.shared.lock().list.len()
    }

    /// Whether the payload has no entries.
    pub fn is_empty(&self) -> bool {
        self.shared.lock().list.is_empty()
    }

    /// Whether this payload holds a literal value.
    pub fn is_literal(&self) -> bool {
        is_literal(&self.shared.lock().list)
    }

    /// Current revision counter.
    pub fn revision(&self) -> u64 {
        self.shared.lock().revision
    }

    /// Get a copy of the value stored under `field`.
    pub fn get(&self, field: &FieldKey) -> Option<Value> {
        let inner = self.shared.lock();
        inner.position(field).map(|i| inner.list[i].value.clone())
    }

    /// Insert an entry, or update it in place if the field already exists.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a blank field name.
    pub fn append(
        &mut self,
        field: impl Into<FieldKey>,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        let entry = PayloadEntry::new(field, value);
        ensure_field(&entry.field)?;
        self.shared.lock().upsert(entry);
        Ok(self)
    }

    /// Remove the entry for `field`. Returns whether one was removed.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for a blank field name.
    pub fn delete(&mut self, field: &FieldKey) -> Result<bool> {
        ensure_field(field)?;
        let mut inner = self.shared.lock();
        match inner.position(field) {
            Some(i) => {
                inner.list.remove(i);
                inner.revision += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drain all entries, leaving the payload empty.
    pub fn collect(&mut self) -> Vec<PayloadEntry> {
        let mut inner = self.shared.lock();
        inner.revision += 1;
        std::mem::take(&mut inner.list)
    }

    /// Consume the payload and return its raw literal or object value.
    pub fn into_value(mut self) -> Value {
        Self::revive(self.collect())
    }

    /// Lazily iterate over field keys.
    pub fn keys(&self) -> PayloadIter<FieldKey> {
        self.iter_with(|e| e.field.clone())
    }

    /// Lazily iterate over values.
    pub fn values(&self) -> PayloadIter<Value> {
        self.iter_with(|e| e.value.clone())
    }

    /// Lazily iterate over entries.
    pub fn entries(&self) -> PayloadIter<PayloadEntry> {
        self.iter_with(Clone::clone)
    }

    /// Drain the payload into its canonical byte form.
    ///
    /// Layout: a list of `[field, value]` pairs.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let entries = self.collect();
        let mut writer = BinaryWriter::new();
        write_entries(&mut writer, &entries)
            .map_err(|e| JetError::InvalidType(format!("payload cannot be encoded: {e}")))?;
        Ok(writer.drain())
    }

    /// Parse canonical bytes back into a payload.
    ///
    /// # Errors
    /// Returns `MalformedPayload` if the bytes are not a valid entry list.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(bytes);
        let entries = read_entries(&mut reader)
            .map_err(|e| JetError::MalformedPayload(e.to_string()))?;
        if !reader.is_empty() {
            return Err(JetError::MalformedPayload(format!(
                "{} trailing bytes after entries",
                reader.remaining()
            )));
        }
        Self::new(entries).map_err(|e| JetError::MalformedPayload(e.to_string()))
    }

    fn iter_with<T>(&self, project: fn(&PayloadEntry) -> T) -> PayloadIter<T> {
        PayloadIter {
            revision: self.revision(),
            shared: Arc::clone(&self.shared),
            index: 0,
            project,
            finished: false,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Payload")
            .field("entries", &inner.list)
            .field("revision", &inner.revision)
            .finish()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.shared, &other.shared) {
            return true;
        }
        self.shared.lock().list == other.shared.lock().list
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = Result<PayloadEntry>;
    type IntoIter = PayloadIter<PayloadEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

/// Fail-fast iterator over a [`Payload`].
///
/// Yields `Err(ConcurrentModification)` once if the payload was mutated after
/// the iterator was created, then ends.
pub struct PayloadIter<T> {
    shared: Arc<Mutex<Entries>>,
    revision: u64,
    index: usize,
    project: fn(&PayloadEntry) -> T,
    finished: bool,
}

impl<T> Iterator for PayloadIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let inner = self.shared.lock();
        if inner.revision != self.revision {
            self.finished = true;
            return Some(Err(JetError::ConcurrentModification));
        }

        match inner.list.get(self.index) {
            Some(entry) => {
                self.index += 1;
                Some(Ok((self.project)(entry)))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl<T> FusedIterator for PayloadIter<T> {}

/// Caller input to the envelope, resolved once at the encode boundary.
#[derive(Debug)]
pub enum PayloadInput {
    /// A non-object value.
    Literal(Value),
    /// Ordered object entries.
    Object(Vec<(FieldKey, Value)>),
    /// An already built payload.
    Wrapped(Payload),
}

impl PayloadInput {
    /// Resolve into a payload.
    pub fn into_payload(self) -> Result<Payload> {
        match self {
            Self::Literal(value) => Ok(Payload::literal(value)),
            Self::Object(entries) => Payload::object(Value::Map(entries)),
            Self::Wrapped(payload) => Ok(payload),
        }
    }
}

impl From<Value> for PayloadInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Map(entries) => Self::Object(entries),
            other => Self::Literal(other),
        }
    }
}

impl From<Payload> for PayloadInput {
    fn from(payload: Payload) -> Self {
        Self::Wrapped(payload)
    }
}

impl From<i64> for PayloadInput {
    fn from(v: i64) -> Self {
        Self::Literal(Value::Int(v))
    }
}

impl From<i32> for PayloadInput {
    fn from(v: i32) -> Self {
        Self::Literal(Value::Int(i64::from(v)))
    }
}

impl From<bool> for PayloadInput {
    fn from(v: bool) -> Self {
        Self::Literal(Value::Bool(v))
    }
}

impl From<&str> for PayloadInput {
    fn from(v: &str) -> Self {
        Self::Literal(Value::from(v))
    }
}

impl From<String> for PayloadInput {
    fn from(v: String) -> Self {
        Self::Literal(Value::Text(v))
    }
}

impl From<Vec<u8>> for PayloadInput {
    fn from(v: Vec<u8>) -> Self {
        Self::Literal(Value::Bytes(v))
    }
}

fn is_literal(entries: &[PayloadEntry]) -> bool {
    entries.len() == 1 && entries[0].field.as_name() == Some(LITERAL_FIELD)
}

fn ensure_field(field: &FieldKey) -> Result<()> {
    if field.is_valid() {
        Ok(())
    } else {
        Err(JetError::InvalidArgument(format!(
            "invalid field key of kind '{}'",
            field.type_name()
        )))
    }
}

fn write_entries(
    writer: &mut BinaryWriter,
    entries: &[PayloadEntry],
) -> std::result::Result<(), crate::core::CodecError> {
    writer.begin_list(entries.len())?;
    for entry in entries {
        writer.begin_list(2)?;
        entry.field.encode(writer)?;
        entry.value.encode(writer)?;
    }
    Ok(())
}

fn read_entries(
    reader: &mut BinaryReader<'_>,
) -> std::result::Result<Vec<PayloadEntry>, crate::core::CodecError> {
    let count = reader.read_list_len()?;
    let mut entries = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let arity = reader.read_list_len()?;
        if arity != 2 {
            return Err(crate::core::CodecError::ArityMismatch {
                expected: 2,
                found: arity,
            });
        }
        let field = FieldKey::decode(reader)?;
        let value = Value::decode(reader)?;
        entries.push(PayloadEntry { field, value });
    }
    Ok(entries)
}
