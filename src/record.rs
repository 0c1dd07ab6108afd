//! Typed field records, the input of the encoder.

use std::num::NonZeroU32;

use bytes::Bytes;

use crate::error::EncodeError;
use crate::types::{ObjectKind, TypeReference};

/// A runtime value held by a [`FieldRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Bytes),
    /// Enum ordinal.
    Enum(i32),
    Message(Vec<FieldRecord>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Whether this is a number equal to zero.
    ///
    /// Booleans and enum ordinals are not numbers here, `false` and the first
    /// enum variant are still written.
    pub fn is_zero_number(&self) -> bool {
        match self {
            FieldValue::I32(v) => *v == 0,
            FieldValue::I64(v) => *v == 0,
            FieldValue::U32(v) => *v == 0,
            FieldValue::U64(v) => *v == 0,
            FieldValue::F32(v) => *v == 0.0,
            FieldValue::F64(v) => *v == 0.0,
            _ => false,
        }
    }
}

macro_rules! impl_from_field_value {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                FieldValue::$variant(value)
            }
        }

        impl FromFieldValue for $ty {
            fn from_field_value(value: &FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    )+};
}

/// Extracts a concrete Rust value out of a [`FieldValue`].
pub trait FromFieldValue: Sized {
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

impl_from_field_value! {
    bool => Bool,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Bytes => Bytes,
    Vec<FieldRecord> => Message,
    Vec<FieldValue> => List,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// One field of an object about to be encoded: its wire metadata and value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    name: String,
    index: NonZeroU32,
    ty: TypeReference,
    value: Option<FieldValue>,
    packed: bool,
    required: bool,
    repeated: bool,
}

impl FieldRecord {
    /// Creates an empty record, failing when `index` is zero.
    pub fn new(
        name: impl Into<String>,
        index: u32,
        ty: impl Into<TypeReference>,
    ) -> Result<Self, EncodeError> {
        let name = name.into();
        let Some(index) = NonZeroU32::new(index) else {
            return Err(EncodeError::InvalidFieldIndex { name });
        };
        Ok(FieldRecord {
            name,
            index,
            ty: ty.into(),
            value: None,
            packed: false,
            required: false,
            repeated: false,
        })
    }

    pub fn value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// A copy of this record holding `value` as a fresh singular assignment.
    pub fn with_value(&self, value: impl Into<FieldValue>) -> Self {
        FieldRecord {
            value: Some(value.into()),
            repeated: false,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> u32 {
        self.index.get()
    }

    pub fn ty(&self) -> &TypeReference {
        &self.ty
    }

    /// Name of the message type when this record holds a nested message.
    pub fn message_type(&self) -> Option<&str> {
        match &self.ty {
            TypeReference::Object(object) if object.kind() != ObjectKind::Enum => {
                Some(object.name())
            }
            _ => None,
        }
    }

    pub fn raw_value(&self) -> Option<&FieldValue> {
        self.value.as_ref()
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    /// Whether the record should be written at all.
    ///
    /// Absent values and numbers equal to zero are skipped. A required
    /// record without a value is an error.
    pub fn valid(&self) -> Result<bool, EncodeError> {
        match &self.value {
            None if self.required => Err(EncodeError::RequiredFieldMissing {
                index: self.index(),
                ty: self.ty.to_string(),
            }),
            None => Ok(false),
            Some(value) => Ok(!value.is_zero_number()),
        }
    }

    /// The stored value as a `T`, `None` when no value is set.
    pub fn value_as<T: FromFieldValue>(&self) -> Result<Option<T>, EncodeError> {
        let Some(value) = &self.value else {
            return Ok(None);
        };
        T::from_field_value(value)
            .map(Some)
            .ok_or_else(|| self.type_mismatch())
    }

    pub(crate) fn type_mismatch(&self) -> EncodeError {
        EncodeError::TypeMismatch {
            record: format!("{self:?}"),
        }
    }
}
