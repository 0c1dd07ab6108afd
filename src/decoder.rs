//! Schema directed decoding of wire data into a [`DecodedMap`].
//!
//! Scalars are decoded by their wire class alone. Length-delimited payloads
//! are ambiguous on the wire (string, bytes, nested message or packed
//! scalars) so the field number is resolved against the host type of the
//! frame being read to pick an interpretation. Nested frames carry their own
//! host type down the call chain.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::cache::{DescriptorCache, FieldDescriptor};
use crate::config::DecoderConfig;
use crate::convert;
use crate::cursor::ByteCursor;
use crate::error::{DecodeError, DecodeErrorKind, FramingError, ResolutionError};
use crate::types::{ObjectKind, PrimitiveType, TypeReference};
use crate::value::{DecodedMap, Value};
use crate::wire::{self, WireType};

/// Decodes messages of one root host type.
///
/// Cheap to clone, every clone shares the same [`DescriptorCache`].
#[derive(Debug, Clone)]
pub struct Decoder {
    cache: Arc<DescriptorCache>,
    root: String,
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder for messages of type `root`.
    pub fn for_type(
        cache: Arc<DescriptorCache>,
        root: impl Into<String>,
    ) -> Result<Self, ResolutionError> {
        let root = root.into();
        let root = cache.schema().message(&root)?.name().to_string();
        Ok(Decoder {
            cache,
            root,
            config: DecoderConfig::default(),
        })
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Decodes `bytes` into a mapping of field numbers to values.
    pub fn decode(&self, bytes: impl Into<Bytes>) -> Result<DecodedMap, DecodeError> {
        let mut cursor = ByteCursor::new(bytes);
        let mut fields = DecodedMap::new();
        match self.decode_frame(&mut cursor, &self.root, 0, &mut fields, 0) {
            Ok(()) => Ok(fields),
            Err(kind) => Err(DecodeError::new(kind, fields.to_debug_text())),
        }
    }

    /// Decodes `bytes` and converts the result into `T`.
    ///
    /// See [`convert::from_decoded`] for how field numbers map onto `T`.
    pub fn decode_into<T: DeserializeOwned>(&self, bytes: impl Into<Bytes>) -> Result<T, DecodeError> {
        let fields = self.decode(bytes)?;
        convert::from_decoded(&fields)
            .map_err(|err| DecodeError::new(err, fields.to_debug_text()))
    }

    /// Decodes `bytes` into a pretty printed dump, for diagnostics only.
    pub fn decode_as_debug_text(&self, bytes: impl Into<Bytes>) -> Result<String, DecodeError> {
        Ok(self.decode(bytes)?.to_debug_text())
    }

    /// Reads fields into `out` until the frame is terminated.
    ///
    /// `end_tag` is the tag expected to close the frame, `0` for end of
    /// input and the matching end-group tag for groups.
    fn decode_frame(
        &self,
        cursor: &mut ByteCursor,
        host: &str,
        depth: usize,
        out: &mut DecodedMap,
        end_tag: u32,
    ) -> Result<(), DecodeErrorKind> {
        if depth > self.config.recursion_limit {
            return Err(FramingError::RecursionLimitExceeded {
                limit: self.config.recursion_limit,
            }
            .into());
        }

        loop {
            let tag = cursor.read_tag()?;
            if tag == 0 {
                break;
            }

            let field = wire::tag_field_number(tag);
            let value = match WireType::try_from_val(wire::tag_wire_bits(tag))? {
                WireType::Varint => Value::Varint(cursor.read_varint64()? as i64),
                WireType::I64 => Value::Fixed64(cursor.read_fixed64()?),
                WireType::I32 => Value::Fixed32(cursor.read_fixed32()?),
                WireType::Len => self.read_delimited(cursor, host, field, depth)?,
                WireType::SGroup => self.read_group(cursor, host, field, depth)?,
                WireType::EGroup => break,
            };
            out.insert_merged(field, value);
        }

        cursor.check_last_tag_was(end_tag)?;
        Ok(())
    }

    fn read_delimited(
        &self,
        cursor: &mut ByteCursor,
        host: &str,
        field: u32,
        depth: usize,
    ) -> Result<Value, DecodeErrorKind> {
        let payload = cursor.read_length_delimited()?;

        let Some(descriptor) = self.cache.resolve(host, field)? else {
            if self.config.warn_on_unknown_field {
                tracing::warn!(field, host, "unknown field, keeping raw bytes");
            }
            return Ok(Value::Bytes(payload));
        };

        if descriptor.is_packed() {
            return Ok(read_packed(payload, descriptor.ty())?);
        }

        match descriptor.ty() {
            TypeReference::Primitive(PrimitiveType::Bytes) => Ok(Value::Bytes(payload)),
            TypeReference::Primitive(PrimitiveType::String) => {
                let text = String::from_utf8(payload.to_vec())
                    .map_err(|_| FramingError::InvalidUtf8)?;
                Ok(Value::Text(text))
            }
            TypeReference::Object(object) if object.kind() == ObjectKind::Message => {
                self.read_nested(payload, &descriptor, depth)
            }
            // Scalars and enums only arrive length-delimited when packed,
            // whatever the field was declared as.
            ty => Ok(read_packed(payload, ty)?),
        }
    }

    fn read_nested(
        &self,
        payload: Bytes,
        descriptor: &FieldDescriptor,
        depth: usize,
    ) -> Result<Value, DecodeErrorKind> {
        let host = descriptor.ty().name();
        let mut nested = DecodedMap::new();
        let mut cursor = ByteCursor::new(payload.clone());

        match self.decode_frame(&mut cursor, host, depth + 1, &mut nested, 0) {
            Ok(()) => Ok(Value::Message(nested)),
            Err(DecodeErrorKind::Framing(err))
                if !matches!(err, FramingError::RecursionLimitExceeded { .. }) =>
            {
                tracing::debug!(
                    field = descriptor.field(),
                    host,
                    %err,
                    "payload is not a valid message, keeping it as text or bytes"
                );
                Ok(match String::from_utf8(payload.to_vec()) {
                    Ok(text) => Value::Text(text),
                    Err(_) => Value::Bytes(payload),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn read_group(
        &self,
        cursor: &mut ByteCursor,
        host: &str,
        field: u32,
        depth: usize,
    ) -> Result<Value, DecodeErrorKind> {
        let group_host = match self.cache.resolve(host, field)? {
            Some(descriptor) => match descriptor.ty() {
                TypeReference::Object(object) if object.kind() == ObjectKind::Message => {
                    object.name().to_string()
                }
                _ => host.to_string(),
            },
            None => host.to_string(),
        };

        let mut nested = DecodedMap::new();
        let end_tag = ByteCursor::end_group_tag(field);
        self.decode_frame(cursor, &group_host, depth + 1, &mut nested, end_tag)?;
        Ok(Value::Message(nested))
    }
}

/// Splits a packed run into elements of the wire class of `ty`.
fn read_packed(payload: Bytes, ty: &TypeReference) -> Result<Value, FramingError> {
    let mut cursor = ByteCursor::new(payload);
    let len = cursor.remaining();
    let wire_type = ty.wire_type();

    if let Some(width) = wire_type.fixed_width() {
        if len % width != 0 {
            return Err(FramingError::InvalidPackedLength {
                expected_multiple: width as u8,
                actual: len,
            });
        }
    }

    let mut items = Vec::new();
    while !cursor.is_at_end() {
        items.push(match wire_type {
            WireType::I32 => Value::Fixed32(cursor.read_fixed32()?),
            WireType::I64 => Value::Fixed64(cursor.read_fixed64()?),
            _ => Value::Varint(cursor.read_varint64()? as i64),
        });
    }
    Ok(Value::List(items))
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::schema::{EnumType, FieldDecl, MessageType, Schema};

    fn decoder() -> Decoder {
        let schema = Schema::builder()
            .message(
                MessageType::new("Sample")
                    .field(FieldDecl::new("id", 1, PrimitiveType::Int64))
                    .field(FieldDecl::new("name", 2, PrimitiveType::String))
                    .field(FieldDecl::new("child", 3, TypeReference::message("Sample")))
                    .field(FieldDecl::repeated("scores", 4, PrimitiveType::Fixed32).packed())
                    .field(FieldDecl::repeated("ids", 5, PrimitiveType::Int32))
                    .field(FieldDecl::new("blob", 6, PrimitiveType::Bytes))
                    .field(FieldDecl::repeated("colors", 7, TypeReference::enumeration("Color")))
                    .field(FieldDecl::new("grp", 8, TypeReference::message("Inner"))),
            )
            .message(
                MessageType::new("Inner")
                    .field(FieldDecl::new("label", 1, PrimitiveType::String)),
            )
            .enumeration(EnumType::new("Color"))
            .build();
        let cache = Arc::new(DescriptorCache::new(schema));
        Decoder::for_type(cache, "Sample").unwrap()
    }

    #[test]
    fn test_decode_varint() {
        let decoded = decoder().decode(Bytes::from_static(&[0x08, 0x01])).unwrap();
        assert_eq!(decoded.get(1), Some(&Value::Varint(1)));
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn test_decode_string() {
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x12, 0x03, b'a', b'b', b'c']))
            .unwrap();
        assert_eq!(decoded.get(2), Some(&Value::Text("abc".to_string())));
    }

    #[test]
    fn test_decode_nested() {
        // child { id: 150 }
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x1a, 0x03, 0x08, 0x96, 0x01]))
            .unwrap();
        let child = decoded.get(3).and_then(Value::as_message).unwrap();
        assert_eq!(child.get(1), Some(&Value::Varint(150)));
    }

    #[test]
    fn test_nested_falls_back_to_text() {
        // "hi!" is not a valid message: 'h' = field 13, wire type 0, then 'i'
        // is a complete varint and '!' is field 4 with wire type 1 and no payload.
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x1a, 0x03, b'h', b'i', b'!']))
            .unwrap();
        assert_eq!(decoded.get(3), Some(&Value::Text("hi!".to_string())));
    }

    #[test]
    fn test_nested_falls_back_to_bytes() {
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x1a, 0x02, 0xff, 0xff]))
            .unwrap();
        assert_eq!(
            decoded.get(3),
            Some(&Value::Bytes(Bytes::from_static(&[0xff, 0xff])))
        );
    }

    #[test]
    fn test_packed_fixed32() {
        let decoded = decoder()
            .decode(Bytes::from_static(&[
                0x22, 0x08, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
            ]))
            .unwrap();
        assert_eq!(
            decoded.get(4),
            Some(&Value::List(vec![Value::Fixed32(1), Value::Fixed32(2)]))
        );
    }

    #[test]
    fn test_packed_fixed32_bad_length() {
        let err = decoder()
            .decode(Bytes::from_static(&[0x22, 0x03, 0x01, 0x00, 0x00]))
            .unwrap_err();
        assert_eq!(
            err.framing(),
            Some(FramingError::InvalidPackedLength {
                expected_multiple: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_packed_varints_have_variable_width() {
        // ids: [1, 300, 2] in a run not declared packed.
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x2a, 0x04, 0x01, 0xac, 0x02, 0x02]))
            .unwrap();
        let ids: Vec<_> = decoded.get(5).unwrap().iter().filter_map(Value::as_i64).collect();
        assert_eq!(ids, [1, 300, 2]);
    }

    #[test]
    fn test_packed_enum() {
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x3a, 0x02, 0x00, 0x02]))
            .unwrap();
        assert_eq!(
            decoded.get(7),
            Some(&Value::List(vec![Value::Varint(0), Value::Varint(2)]))
        );
    }

    #[test]
    fn test_invalid_utf8_string() {
        let err = decoder()
            .decode(Bytes::from_static(&[0x12, 0x02, 0xc3, 0x28]))
            .unwrap_err();
        assert_eq!(err.framing(), Some(FramingError::InvalidUtf8));
    }

    #[test]
    fn test_group_uses_resolved_host() {
        // grp (field 8) as a group containing label "x", then id 1.
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x43, 0x0a, 0x01, b'x', 0x44, 0x08, 0x01]))
            .unwrap();
        let group = decoded.get(8).and_then(Value::as_message).unwrap();
        assert_eq!(group.get(1), Some(&Value::Text("x".to_string())));
        assert_eq!(decoded.get(1), Some(&Value::Varint(1)));
    }

    #[test]
    fn test_group_errors() {
        let decoder = decoder();

        let err = decoder.decode(Bytes::from_static(&[0x43, 0x08, 0x01])).unwrap_err();
        assert_eq!(err.framing(), Some(FramingError::UnterminatedGroup { field: 8 }));

        let err = decoder.decode(Bytes::from_static(&[0x43, 0x4c])).unwrap_err();
        assert_eq!(
            err.framing(),
            Some(FramingError::MismatchedEndGroup {
                expected: 8,
                actual: 9
            })
        );

        let err = decoder.decode(Bytes::from_static(&[0x08, 0x01, 0x44])).unwrap_err();
        assert_eq!(err.framing(), Some(FramingError::UnexpectedEndGroup { field: 8 }));
    }

    #[test]
    fn test_stray_end_group_in_nested_payload() {
        // The child payload is a lone end-group tag, which happens to be 'D'.
        let decoded = decoder()
            .decode(Bytes::from_static(&[0x1a, 0x01, 0x44]))
            .unwrap();
        assert_eq!(decoded.get(3), Some(&Value::Text("D".to_string())));
    }

    #[test]
    fn test_recursion_limit() {
        let mut config = DecoderConfig::new();
        config.recursion_limit(2);
        let decoder = decoder().with_config(config);

        // child { child { id: 1 } } stays within the limit.
        let ok = [0x1a, 0x04, 0x1a, 0x02, 0x08, 0x01];
        assert!(decoder.decode(Bytes::copy_from_slice(&ok)).is_ok());

        // child { child { child { id: 1 } } } does not.
        let deep = [0x1a, 0x06, 0x1a, 0x04, 0x1a, 0x02, 0x08, 0x01];
        let err = decoder.decode(Bytes::copy_from_slice(&deep)).unwrap_err();
        assert_eq!(
            err.framing(),
            Some(FramingError::RecursionLimitExceeded { limit: 2 })
        );
    }

    #[test]
    fn test_unknown_field_numbers_do_not_grow_cache() {
        let decoder = decoder();

        let mut input = vec![0x12, 0x01, b'a'];
        for field in 100..1_100 {
            wire::encode_key(WireType::Len, field, &mut input);
            input.push(0x00);
        }

        for _ in 0..10 {
            let decoded = decoder.decode(input.clone()).unwrap();
            assert_eq!(decoded.len(), 1_001);
        }
        assert_eq!(decoder.cache.cached_descriptors(), 1);
    }

    #[test]
    fn test_unknown_root() {
        let cache = Arc::new(DescriptorCache::new(Schema::builder().build()));
        assert!(matches!(
            Decoder::for_type(cache, "Missing"),
            Err(ResolutionError::UnknownHostType { .. })
        ));
    }

    #[test]
    fn test_partial_dump() {
        let err = decoder()
            .decode(Bytes::from_static(&[0x08, 0x07, 0x12, 0x0a, b'a']))
            .unwrap_err();
        assert_eq!(err.framing(), Some(FramingError::UnexpectedEndOfBuffer));
        assert!(err.partial().contains("\"1\": 7"), "{}", err.partial());
        assert_eq!(
            err.to_string(),
            "failed to decode message: unexpected end of buffer"
        );
    }
}
