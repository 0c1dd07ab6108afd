//! Forward-only reader over an encoded message.
//!
//! The cursor knows nothing about schemas, it only understands the byte level
//! framing of the wire format: varints, fixed width integers and length
//! prefixed slices.

use bytes::{Buf, Bytes};

use crate::error::FramingError;
use crate::leb128::LebCodec;
use crate::util::unlikely;
use crate::wire::{self, WireType};

/// Sequential reader over an immutable byte buffer.
///
/// Length-delimited reads hand out sub-slices of the same allocation, so
/// nested frames never copy their payload.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    buf: Bytes,
    total_len: usize,
    last_tag: u32,
}

impl ByteCursor {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        let buf = buf.into();
        ByteCursor {
            total_len: buf.len(),
            buf,
            last_tag: 0,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.total_len - self.buf.remaining()
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_at_end(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// The most recent value returned by [`ByteCursor::read_tag`].
    pub fn last_tag(&self) -> u32 {
        self.last_tag
    }

    /// Reads the next field tag, returning `0` once the input is exhausted.
    ///
    /// Since `0` is reserved for "no more fields", a tag whose field number
    /// is zero is rejected regardless of its wire type bits. Tags wider than
    /// 32 bits are rejected too, truncating would name a different field.
    pub fn read_tag(&mut self) -> Result<u32, FramingError> {
        if self.is_at_end() {
            self.last_tag = 0;
            return Ok(0);
        }

        let tag = self.read_varint64()?;
        let tag = u32::try_from(tag).map_err(|_| FramingError::invalid_varint())?;
        if unlikely(wire::tag_field_number(tag) == 0) {
            return Err(FramingError::InvalidTag);
        }
        self.last_tag = tag;
        Ok(tag)
    }

    /// Reads a varint and truncates it to 32 bits.
    ///
    /// Negative `int32` values are sign extended to ten bytes on the wire, so
    /// we accept the full 64-bit encoding and keep the low half.
    pub fn read_varint32(&mut self) -> Result<u32, FramingError> {
        let value = self.read_varint64()?;
        Ok(value as u32)
    }

    pub fn read_varint64(&mut self) -> Result<u64, FramingError> {
        let (value, _) = u64::decode_leb128_buf(&mut self.buf)?;
        Ok(value)
    }

    pub fn read_fixed32(&mut self) -> Result<u32, FramingError> {
        if unlikely(self.buf.remaining() < 4) {
            return Err(FramingError::unexpected_end_of_buffer());
        }
        Ok(self.buf.get_u32_le())
    }

    pub fn read_fixed64(&mut self) -> Result<u64, FramingError> {
        if unlikely(self.buf.remaining() < 8) {
            return Err(FramingError::unexpected_end_of_buffer());
        }
        Ok(self.buf.get_u64_le())
    }

    /// Reads a varint length prefix followed by exactly that many bytes.
    pub fn read_length_delimited(&mut self) -> Result<Bytes, FramingError> {
        let len = wire::decode_len(&mut self.buf)?;
        if self.buf.remaining() < len {
            return Err(FramingError::unexpected_end_of_buffer());
        }
        Ok(self.buf.split_to(len))
    }

    /// Asserts that the frame being read was terminated by `expected`.
    ///
    /// `0` means "end of input", anything else is the end-group tag that
    /// should have closed a group.
    pub fn check_last_tag_was(&self, expected: u32) -> Result<(), FramingError> {
        if self.last_tag == expected {
            return Ok(());
        }

        let actual = wire::tag_field_number(self.last_tag);
        let expected_field = wire::tag_field_number(expected);
        Err(match (expected, self.last_tag) {
            (0, _) => FramingError::UnexpectedEndGroup { field: actual },
            (_, 0) => FramingError::UnterminatedGroup {
                field: expected_field,
            },
            _ => FramingError::MismatchedEndGroup {
                expected: expected_field,
                actual,
            },
        })
    }

    /// Asserts that the input ended on a field boundary rather than an
    /// unmatched end-group marker.
    pub fn check_ended_cleanly(&self) -> Result<(), FramingError> {
        self.check_last_tag_was(0)
    }

    /// Convenience for the end-group tag matching a start-group `field_number`.
    pub(crate) fn end_group_tag(field_number: u32) -> u32 {
        wire::make_tag(field_number, WireType::EGroup)
    }
}
