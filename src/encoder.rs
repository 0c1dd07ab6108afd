//! Encoding of field records and decoded maps back into wire bytes.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EncodeError;
use crate::leb128::LebCodec;
use crate::record::{FieldRecord, FieldValue};
use crate::types::{ObjectKind, PrimitiveType, TypeReference};
use crate::util::{zigzag_encode_32, zigzag_encode_64};
use crate::value::{DecodedMap, Value};
use crate::wire::{encode_key, WireType};

/// Encodes `records` as the fields of one message.
///
/// Records that are not [valid](FieldRecord::valid) are skipped, list values
/// are written as one entry per element or, for packed records, as a single
/// length-delimited run.
pub fn encode_records(records: &[FieldRecord]) -> Result<Bytes, EncodeError> {
    let mut buf = BytesMut::new();
    write_records(records, &mut buf)?;
    Ok(buf.freeze())
}

/// Encodes a decoded map back into wire bytes.
///
/// Lists of two or more elements become repeated entries of the same field
/// number. Shorter lists only come out of the decoder as packed runs, so they
/// are written back as one. Decoding the output against the schema the map
/// was decoded with yields the same map.
pub fn encode_map(map: &DecodedMap) -> Bytes {
    let mut buf = BytesMut::new();
    write_map(map, &mut buf);
    buf.freeze()
}

fn write_records(records: &[FieldRecord], buf: &mut BytesMut) -> Result<(), EncodeError> {
    for record in records {
        if !record.valid()? {
            continue;
        }
        match record.raw_value() {
            Some(FieldValue::List(items)) if record.is_packed() => {
                write_packed(record, items, buf)?
            }
            Some(FieldValue::List(items)) => {
                for item in items {
                    write_value(record, item, buf)?;
                }
            }
            Some(value) => write_value(record, value, buf)?,
            None => {}
        }
    }
    Ok(())
}

fn write_value(record: &FieldRecord, value: &FieldValue, buf: &mut BytesMut) -> Result<(), EncodeError> {
    let field = record.index();
    if let Some(scalar) = Scalar::of(record.ty(), value) {
        encode_key(scalar.wire_type(), field, buf);
        scalar.write(buf);
        return Ok(());
    }

    match (record.ty(), value) {
        (TypeReference::Primitive(PrimitiveType::String), FieldValue::String(text)) => {
            write_delimited(field, text.as_bytes(), buf)
        }
        (TypeReference::Primitive(PrimitiveType::Bytes), FieldValue::Bytes(bytes)) => {
            write_delimited(field, bytes, buf)
        }
        (TypeReference::Object(object), FieldValue::Message(fields))
            if object.kind() != ObjectKind::Enum =>
        {
            let mut nested = BytesMut::new();
            write_records(fields, &mut nested)?;
            write_delimited(field, &nested, buf)
        }
        _ => return Err(record.type_mismatch()),
    }
    Ok(())
}

fn write_packed(record: &FieldRecord, items: &[FieldValue], buf: &mut BytesMut) -> Result<(), EncodeError> {
    if !record.ty().is_packable() {
        return Err(record.type_mismatch());
    }

    let mut payload = BytesMut::new();
    for item in items {
        Scalar::of(record.ty(), item)
            .ok_or_else(|| record.type_mismatch())?
            .write(&mut payload);
    }
    write_delimited(record.index(), &payload, buf);
    Ok(())
}

fn write_map(map: &DecodedMap, buf: &mut BytesMut) {
    for (&field, value) in map {
        write_map_value(field, value, buf);
    }
}

fn write_map_value(field: u32, value: &Value, buf: &mut BytesMut) {
    if let Some(scalar) = Scalar::from_value(value) {
        encode_key(scalar.wire_type(), field, buf);
        scalar.write(buf);
        return;
    }

    match value {
        Value::Text(text) => write_delimited(field, text.as_bytes(), buf),
        Value::Bytes(bytes) => write_delimited(field, bytes, buf),
        Value::Message(nested) => {
            let mut payload = BytesMut::new();
            write_map(nested, &mut payload);
            write_delimited(field, &payload, buf);
        }
        Value::List(items) => match items.as_slice() {
            [] => write_delimited(field, &[], buf),
            [item] => match Scalar::from_value(item) {
                Some(scalar) => {
                    let mut payload = BytesMut::new();
                    scalar.write(&mut payload);
                    write_delimited(field, &payload, buf);
                }
                None => write_map_value(field, item, buf),
            },
            _ => {
                for item in items {
                    write_map_value(field, item, buf);
                }
            }
        },
        Value::Varint(_) | Value::Fixed32(_) | Value::Fixed64(_) => {}
    }
}

fn write_delimited(field: u32, payload: &[u8], buf: &mut BytesMut) {
    encode_key(WireType::Len, field, buf);
    (payload.len() as u64).encode_leb128(buf);
    buf.put_slice(payload);
}

/// A value of one of the non length-delimited wire classes.
#[derive(Debug, Copy, Clone, PartialEq)]
enum Scalar {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
}

impl Scalar {
    fn of(ty: &TypeReference, value: &FieldValue) -> Option<Self> {
        let primitive = match ty {
            TypeReference::Primitive(primitive) => *primitive,
            TypeReference::Object(object) => {
                return match value {
                    // int32 rules apply: negative ordinals are sign extended.
                    FieldValue::Enum(v) if object.kind() != ObjectKind::Message => {
                        Some(Scalar::Varint(*v as i64 as u64))
                    }
                    _ => None,
                };
            }
        };

        Some(match (primitive, value) {
            (PrimitiveType::Int32, FieldValue::I32(v)) => Scalar::Varint(*v as i64 as u64),
            (PrimitiveType::Int64, FieldValue::I64(v)) => Scalar::Varint(*v as u64),
            (PrimitiveType::Uint32, FieldValue::U32(v)) => Scalar::Varint(u64::from(*v)),
            (PrimitiveType::Uint64, FieldValue::U64(v)) => Scalar::Varint(*v),
            (PrimitiveType::Sint32, FieldValue::I32(v)) => {
                Scalar::Varint(u64::from(zigzag_encode_32(*v)))
            }
            (PrimitiveType::Sint64, FieldValue::I64(v)) => Scalar::Varint(zigzag_encode_64(*v)),
            (PrimitiveType::Bool, FieldValue::Bool(v)) => Scalar::Varint(u64::from(*v)),
            (PrimitiveType::Fixed32, FieldValue::U32(v)) => Scalar::Fixed32(*v),
            (PrimitiveType::Sfixed32, FieldValue::I32(v)) => Scalar::Fixed32(*v as u32),
            (PrimitiveType::Float, FieldValue::F32(v)) => Scalar::Fixed32(v.to_bits()),
            (PrimitiveType::Fixed64, FieldValue::U64(v)) => Scalar::Fixed64(*v),
            (PrimitiveType::Sfixed64, FieldValue::I64(v)) => Scalar::Fixed64(*v as u64),
            (PrimitiveType::Double, FieldValue::F64(v)) => Scalar::Fixed64(v.to_bits()),
            _ => return None,
        })
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Varint(v) => Some(Scalar::Varint(*v as u64)),
            Value::Fixed32(v) => Some(Scalar::Fixed32(*v)),
            Value::Fixed64(v) => Some(Scalar::Fixed64(*v)),
            _ => None,
        }
    }

    fn wire_type(self) -> WireType {
        match self {
            Scalar::Varint(_) => WireType::Varint,
            Scalar::Fixed32(_) => WireType::I32,
            Scalar::Fixed64(_) => WireType::I64,
        }
    }

    fn write<B: BufMut>(self, buf: &mut B) {
        match self {
            Scalar::Varint(v) => {
                v.encode_leb128(buf);
            }
            Scalar::Fixed32(v) => buf.put_u32_le(v),
            Scalar::Fixed64(v) => buf.put_u64_le(v),
        }
    }
}
