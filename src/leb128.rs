//! LEB128 variable-length integer encoding/decoding.

// This module uses `as` casts which have been reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::error::FramingError;

/// Types that can be decoded from a LEB128 encoded integer.
pub trait LebCodec: Sized + Copy {
    /// Maximum number of bytes a well formed encoding of `Self` occupies.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 variable length integer from the front of `data`.
    ///
    /// Returns a tuple of the decoded value and the number of bytes read to
    /// decode said value.
    ///
    /// # Errors
    ///
    /// * [`FramingError::UnexpectedEndOfBuffer`] if `data` ends before the
    ///   final byte (one with the continuation bit cleared) is found.
    /// * [`FramingError::InvalidVarInt`] if the encoding runs past
    ///   [`LebCodec::MAX_LEB_BYTES`] or overflows `Self`.
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), FramingError>;

    /// Decode a LEB128 variable length integer from a [`bytes::Buf`],
    /// advancing it past the integer.
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<(Self, usize), FramingError> {
        let chunk = buf.chunk();

        // Fast path: the whole integer lives in the current chunk.
        if chunk.len() >= Self::MAX_LEB_BYTES || chunk.len() == buf.remaining() {
            let (value, bytes_read) = Self::decode_leb128(chunk)?;
            buf.advance(bytes_read);
            return Ok((value, bytes_read));
        }

        // Slow path: the integer might straddle chunks, gather byte by byte.
        let mut buffer = [0u8; 10];
        for i in 0..Self::MAX_LEB_BYTES {
            if !buf.has_remaining() {
                return Err(FramingError::unexpected_end_of_buffer());
            }
            buffer[i] = buf.get_u8();
            if buffer[i] < 0x80 {
                return Self::decode_leb128(&buffer[..=i]);
            }
        }
        Err(FramingError::invalid_varint())
    }

    /// Encode `self` as a LEB128 variable length integer into the provided
    /// buffer, returning the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

macro_rules! impl_leb_codec {
    ($ty:ty, $max_bytes:expr, $last_byte_limit:expr) => {
        impl LebCodec for $ty {
            const MAX_LEB_BYTES: usize = $max_bytes;

            #[inline]
            fn decode_leb128(data: &[u8]) -> Result<(Self, usize), FramingError> {
                let mut value: $ty = 0;
                for (i, &b) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
                    if i == Self::MAX_LEB_BYTES - 1 && b >= $last_byte_limit {
                        // Either the continuation bit is still set or the
                        // value doesn't fit in our type.
                        return Err(FramingError::invalid_varint());
                    }
                    value |= ((b & 0x7f) as $ty) << (7 * i);
                    if b < 0x80 {
                        return Ok((value, i + 1));
                    }
                }

                if data.len() < Self::MAX_LEB_BYTES {
                    Err(FramingError::unexpected_end_of_buffer())
                } else {
                    Err(FramingError::invalid_varint())
                }
            }

            #[inline]
            fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
                let mut value = self;
                let mut written = 1;
                while value >= 0x80 {
                    buf.put_u8((value as u8) | 0x80);
                    value >>= 7;
                    written += 1;
                }
                buf.put_u8(value as u8);
                written
            }

            /// LEB128 encodes 7 bits per byte, so the length is
            /// `ceil(significant_bits / 7)` with a minimum of 1 byte for 0.
            #[inline]
            fn encoded_leb128_len(self) -> usize {
                let significant_bits = <$ty>::BITS - self.leading_zeros();
                (significant_bits as usize).div_ceil(7).max(1)
            }
        }
    };
}

// The 10th byte of a u64 only carries the top bit, the 5th byte of a u32
// carries the top four bits.
impl_leb_codec!(u64, 10, 0x02);
impl_leb_codec!(u32, 5, 0x10);
