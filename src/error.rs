//! Error types for decoding, type resolution and encoding.

use thiserror::Error;

/// Byte level problems with an encoded message.
///
/// These are always fatal: the whole decode call is aborted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },
    #[error("invalid tag: field number 0")]
    InvalidTag,
    #[error("invalid leb128 varint")]
    InvalidVarInt,
    #[error("unexpected end of buffer")]
    UnexpectedEndOfBuffer,
    #[error("length prefix {value} exceeds platform addressable memory")]
    LengthOverflow { value: u64 },
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("invalid packed field length: {actual} is not a multiple of {expected_multiple}")]
    InvalidPackedLength { expected_multiple: u8, actual: usize },
    #[error("end group for field {field} outside of a group")]
    UnexpectedEndGroup { field: u32 },
    #[error("group for field {field} was never closed")]
    UnterminatedGroup { field: u32 },
    #[error("group for field {expected} closed by end group for field {actual}")]
    MismatchedEndGroup { expected: u32, actual: u32 },
    #[error("message nesting exceeds the recursion limit of {limit}")]
    RecursionLimitExceeded { limit: usize },
}

impl FramingError {
    #[cold]
    #[inline(never)]
    pub(crate) fn invalid_varint() -> Self {
        FramingError::InvalidVarInt
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn unexpected_end_of_buffer() -> Self {
        FramingError::UnexpectedEndOfBuffer
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn invalid_wire_type(value: u8) -> Self {
        FramingError::InvalidWireType { value }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn length_overflow(value: u64) -> Self {
        FramingError::LengthOverflow { value }
    }
}

/// The host type model could not tell what a field should decode to.
///
/// Signals a defect in the registered schema, never in the input data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unknown host type '{name}'")]
    UnknownHostType { name: String },
    #[error("cannot deduce the element type of field '{field}' in '{host}' through its container hierarchy")]
    UnresolvedElementType { host: String, field: String },
    #[error("cannot use the type descriptor of '{host}': field '{field}' does not declare its wire index")]
    MissingFieldIndex { host: String, field: String },
    #[error("type descriptor of '{host}' has no entry for index {index}")]
    MissingDescriptorEntry { host: String, index: u32 },
    #[error("field '{field}' in '{host}' is marked packed but its element type is not a scalar")]
    PackedNonScalar { host: String, field: String },
    #[error("type hierarchy of '{name}' loops back on itself")]
    CyclicHierarchy { name: String },
    #[error("'{name}' is a container type and cannot be used as a field type")]
    NotAFieldType { name: String },
}

/// Returned by [`crate::types::TypeReference::of`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("unknown type: {name}")]
    UnknownType { name: String },
}

/// Errors raised while turning field records into wire bytes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("cannot encode object: missing mandatory field with index {index} and type {ty}")]
    RequiredFieldMissing { index: u32, ty: String },
    #[error("a field misreported its own type in a schema: {record}")]
    TypeMismatch { record: String },
    #[error("field '{name}' has invalid index 0")]
    InvalidFieldIndex { name: String },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Underlying cause of a [`DecodeError`].
#[derive(Debug, Error)]
pub enum DecodeErrorKind {
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("cannot convert decoded fields: {0}")]
    Conversion(#[from] serde_json::Error),
}

/// The single failure surfaced by every decode entry point.
///
/// Carries a best-effort dump of the top-level fields decoded before the
/// failure, which is usually enough to tell which field went wrong.
#[derive(Debug, Error)]
#[error("failed to decode message: {kind}")]
pub struct DecodeError {
    #[source]
    kind: DecodeErrorKind,
    partial: String,
}

impl DecodeError {
    pub(crate) fn new(kind: impl Into<DecodeErrorKind>, partial: String) -> Self {
        DecodeError {
            kind: kind.into(),
            partial,
        }
    }

    /// The underlying cause.
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// Pretty printed dump of the fields decoded before the failure.
    pub fn partial(&self) -> &str {
        &self.partial
    }

    /// Returns the framing error, if that is what caused the failure.
    pub fn framing(&self) -> Option<FramingError> {
        match &self.kind {
            DecodeErrorKind::Framing(err) => Some(*err),
            _ => None,
        }
    }

    /// Returns the resolution error, if that is what caused the failure.
    pub fn resolution(&self) -> Option<&ResolutionError> {
        match &self.kind {
            DecodeErrorKind::Resolution(err) => Some(err),
            _ => None,
        }
    }
}
