//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use crate::error::FramingError;
use crate::leb128::LebCodec;
use crate::util::likely;

/// Minimum value of a protobuf field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Builds the raw tag for `field_number` and `wire_type`.
///
/// Follows the specification from <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
#[inline(always)]
pub const fn make_tag(field_number: u32, wire_type: WireType) -> u32 {
    (field_number << 3) | wire_type.into_val() as u32
}

/// Returns the field number portion of a raw tag.
#[inline(always)]
pub const fn tag_field_number(tag: u32) -> u32 {
    tag >> 3
}

/// Returns the raw (unvalidated) wire type bits of a tag.
#[inline(always)]
pub const fn tag_wire_bits(tag: u32) -> u8 {
    (tag & 0b111) as u8
}

/// Encodes the provided field number and wire type as a protobuf field key.
#[inline(always)]
pub fn encode_key<B: bytes::BufMut>(wire_type: WireType, field_number: u32, buf: &mut B) {
    make_tag(field_number, wire_type).encode_leb128(buf);
}

/// Returns the encoded length of a field key.
#[inline(always)]
pub fn encoded_key_len(field_number: u32) -> usize {
    // The wire type only occupies the low 3 bits and never changes the length.
    (field_number << 3).encoded_leb128_len()
}

/// Decodes the length prefix for a length-delimited field.
#[inline(always)]
pub fn decode_len<B: bytes::Buf>(buf: &mut B) -> Result<usize, FramingError> {
    let chunk = buf.chunk();
    // Fast path, most lengths fit in one byte (< 128).
    if likely(!chunk.is_empty() && chunk[0] < 0x80) {
        let len = usize::from(chunk[0]);
        buf.advance(1);
        Ok(len)
    } else {
        let (len, _) = u64::decode_leb128_buf(buf)?;
        usize::try_from(len).map_err(|_| FramingError::length_overflow(len))
    }
}

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded each key-value pair
/// is turned into a record consisting of a field number, a [`WireType`], and a payload.
/// The [`WireType`] indicates how large the proceeding payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

static_assertions::assert_eq_size!(WireType, u8);
static_assertions::const_assert_eq!(WireType::I32 as u8, 5);

impl WireType {
    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    pub fn try_from_val(value: u8) -> Result<Self, FramingError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            _ => Err(FramingError::invalid_wire_type(value)),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }

    /// Fixed payload width in bytes, `None` for variable sized wire types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::I32 => Some(4),
            WireType::I64 => Some(8),
            _ => None,
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = FramingError;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, FramingError> {
        WireType::try_from_val(value)
    }
}
