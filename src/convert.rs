//! Conversion of a [`DecodedMap`] into user types through `serde`.
//!
//! The decoded map is rendered as a JSON document whose keys are field
//! numbers, a target type names its fields after them:
//!
//! ```
//! # use protolens::{DecodedMap, Value};
//! #[derive(serde::Deserialize)]
//! struct Person {
//!     #[serde(rename = "1")]
//!     id: i64,
//!     #[serde(rename = "2", default)]
//!     name: String,
//! }
//!
//! let mut map = DecodedMap::new();
//! map.insert(1, 42i64);
//! map.insert(2, "Ada");
//! let person: Person = protolens::convert::from_decoded(&map).unwrap();
//! assert_eq!((person.id, person.name.as_str()), (42, "Ada"));
//! ```
//!
//! Scalars keep their wire representation, the `deserialize_with` helpers in
//! this module reinterpret them.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;

use crate::util::{zigzag_decode_32, zigzag_decode_64};
use crate::value::DecodedMap;

/// Converts `map` into `T`, field numbers acting as member names.
pub fn from_decoded<T: DeserializeOwned>(map: &DecodedMap) -> Result<T, serde_json::Error> {
    serde_json::to_value(map).and_then(serde_json::from_value)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Accepts either a single value or a sequence where a sequence is expected.
///
/// A repeated field seen once on the wire decodes to a lone value.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(items) => items,
        OneOrMany::One(item) => vec![item],
    })
}

/// Reads a `float` from its fixed32 bit pattern.
pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    u32::deserialize(deserializer).map(f32::from_bits)
}

/// Reads a `double` from its fixed64 bit pattern.
pub fn double<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    u64::deserialize(deserializer).map(f64::from_bits)
}

/// Reads a zigzag encoded `sint32`.
pub fn sint32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    i64::deserialize(deserializer).map(|raw| zigzag_decode_32(raw as u32))
}

/// Reads a zigzag encoded `sint64`.
pub fn sint64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    i64::deserialize(deserializer).map(|raw| zigzag_decode_64(raw as u64))
}
