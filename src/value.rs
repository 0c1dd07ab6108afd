//! The generic result of a decode: field numbers mapped to loosely typed
//! values.

use std::collections::btree_map::{self, BTreeMap, Entry};

use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A single decoded field value.
///
/// Scalars keep the representation of their wire class, interpreting them
/// (as a float, a zigzag integer, an enum ordinal...) is left to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A varint, reinterpreted as a signed 64-bit integer.
    Varint(i64),
    Fixed32(u32),
    Fixed64(u64),
    Text(String),
    Bytes(Bytes),
    Message(DecodedMap),
    /// Several values seen for the same field number, in encounter order.
    List(Vec<Value>),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Varint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Fixed32(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Fixed64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&DecodedMap> {
        match self {
            Value::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Views the value as a sequence, a lone value being a sequence of one.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        match self {
            Value::List(items) => items.iter(),
            single => std::slice::from_ref(single).iter(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Varint(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<DecodedMap> for Value {
    fn from(value: DecodedMap) -> Self {
        Value::Message(value)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Varint(value) => serializer.serialize_i64(*value),
            Value::Fixed32(value) => serializer.serialize_u32(*value),
            Value::Fixed64(value) => serializer.serialize_u64(*value),
            Value::Text(text) => serializer.serialize_str(text),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Message(message) => message.serialize(serializer),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Field numbers of one frame mapped to their values, ordered by number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMap {
    fields: BTreeMap<u32, Value>,
}

impl DecodedMap {
    pub fn new() -> Self {
        DecodedMap::default()
    }

    /// Records `value` for `field`, accumulating repeated occurrences.
    ///
    /// A second occurrence turns the entry into a [`Value::List`]. Lists on
    /// either side are flattened so the result never nests.
    pub fn insert_merged(&mut self, field: u32, value: Value) {
        let existing = match self.fields.entry(field) {
            Entry::Vacant(entry) => {
                entry.insert(value);
                return;
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };

        let mut items = match std::mem::replace(existing, Value::List(Vec::new())) {
            Value::List(items) => items,
            other => vec![other],
        };
        match value {
            Value::List(more) => items.extend(more),
            other => items.push(other),
        }
        *existing = Value::List(items);
    }

    /// Replaces whatever was recorded for `field`.
    pub fn insert(&mut self, field: u32, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field, value.into())
    }

    pub fn get(&self, field: u32) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn remove(&mut self, field: u32) -> Option<Value> {
        self.fields.remove(&field)
    }

    pub fn contains(&self, field: u32) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, Value> {
        self.fields.iter()
    }

    /// Pretty printed JSON rendering, for diagnostics only.
    pub fn to_debug_text(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|err| format!("<unprintable decoded message: {err}>"))
    }
}

impl<'a> IntoIterator for &'a DecodedMap {
    type Item = (&'a u32, &'a Value);
    type IntoIter = btree_map::Iter<'a, u32, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl FromIterator<(u32, Value)> for DecodedMap {
    fn from_iter<I: IntoIterator<Item = (u32, Value)>>(iter: I) -> Self {
        let mut map = DecodedMap::new();
        for (field, value) in iter {
            map.insert_merged(field, value);
        }
        map
    }
}

impl Serialize for DecodedMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}
