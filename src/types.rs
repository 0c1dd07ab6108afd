//! Type references shared by the host type model, the decoder and the
//! encoder.

use core::fmt;

use crate::error::TypeError;
use crate::wire::WireType;

/// Scalar protobuf types.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Bool,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Float,
    Double,
    String,
    Bytes,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 15] = [
        PrimitiveType::Int32,
        PrimitiveType::Int64,
        PrimitiveType::Uint32,
        PrimitiveType::Uint64,
        PrimitiveType::Sint32,
        PrimitiveType::Sint64,
        PrimitiveType::Bool,
        PrimitiveType::Fixed32,
        PrimitiveType::Fixed64,
        PrimitiveType::Sfixed32,
        PrimitiveType::Sfixed64,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::String,
        PrimitiveType::Bytes,
    ];

    /// Parses the canonical `.proto` spelling of a scalar type.
    pub fn from_name(name: &str) -> Option<Self> {
        PrimitiveType::ALL
            .into_iter()
            .find(|primitive| primitive.proto_name() == name)
    }

    pub const fn proto_name(self) -> &'static str {
        match self {
            PrimitiveType::Int32 => "int32",
            PrimitiveType::Int64 => "int64",
            PrimitiveType::Uint32 => "uint32",
            PrimitiveType::Uint64 => "uint64",
            PrimitiveType::Sint32 => "sint32",
            PrimitiveType::Sint64 => "sint64",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Fixed32 => "fixed32",
            PrimitiveType::Fixed64 => "fixed64",
            PrimitiveType::Sfixed32 => "sfixed32",
            PrimitiveType::Sfixed64 => "sfixed64",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::String => "string",
            PrimitiveType::Bytes => "bytes",
        }
    }

    /// The Rust type values of this primitive are represented as.
    pub const fn rust_type(self) -> &'static str {
        match self {
            PrimitiveType::Int32 | PrimitiveType::Sint32 | PrimitiveType::Sfixed32 => "i32",
            PrimitiveType::Int64 | PrimitiveType::Sint64 | PrimitiveType::Sfixed64 => "i64",
            PrimitiveType::Uint32 | PrimitiveType::Fixed32 => "u32",
            PrimitiveType::Uint64 | PrimitiveType::Fixed64 => "u64",
            PrimitiveType::Bool => "bool",
            PrimitiveType::Float => "f32",
            PrimitiveType::Double => "f64",
            PrimitiveType::String => "String",
            PrimitiveType::Bytes => "Bytes",
        }
    }

    pub const fn wire_type(self) -> WireType {
        match self {
            PrimitiveType::Int32
            | PrimitiveType::Int64
            | PrimitiveType::Uint32
            | PrimitiveType::Uint64
            | PrimitiveType::Sint32
            | PrimitiveType::Sint64
            | PrimitiveType::Bool => WireType::Varint,
            PrimitiveType::Fixed32 | PrimitiveType::Sfixed32 | PrimitiveType::Float => WireType::I32,
            PrimitiveType::Fixed64 | PrimitiveType::Sfixed64 | PrimitiveType::Double => WireType::I64,
            PrimitiveType::String | PrimitiveType::Bytes => WireType::Len,
        }
    }

    /// Whether values of this type are numbers, and thus elided when zero.
    pub const fn is_numeric(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Bool | PrimitiveType::String | PrimitiveType::Bytes
        )
    }

    /// Whether repeated values of this type may use the packed encoding.
    pub const fn is_packable(self) -> bool {
        !matches!(self, PrimitiveType::String | PrimitiveType::Bytes)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.proto_name())
    }
}

/// What a named type turned out to be once looked up in a schema.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Parsed from a name, not yet looked up.
    Unattributed,
    Message,
    Enum,
}

/// A named message or enum type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectType {
    name: String,
    kind: ObjectKind,
}

impl ObjectType {
    pub fn unattributed(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            kind: ObjectKind::Unattributed,
        }
    }

    pub fn message(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            kind: ObjectKind::Message,
        }
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        ObjectType {
            name: name.into(),
            kind: ObjectKind::Enum,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_attributed(&self) -> bool {
        self.kind != ObjectKind::Unattributed
    }

    /// Enums travel as their ordinal, everything else is a nested message.
    pub fn wire_type(&self) -> WireType {
        match self.kind {
            ObjectKind::Enum => WireType::Varint,
            ObjectKind::Message | ObjectKind::Unattributed => WireType::Len,
        }
    }
}

/// Reference to the type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeReference {
    Primitive(PrimitiveType),
    Object(ObjectType),
}

impl TypeReference {
    /// Parses a canonical type name.
    ///
    /// Scalar names produce [`TypeReference::Primitive`], any other well formed
    /// (optionally dotted) identifier produces an unattributed
    /// [`TypeReference::Object`].
    pub fn of(name: &str) -> Result<Self, TypeError> {
        if let Some(primitive) = PrimitiveType::from_name(name) {
            return Ok(TypeReference::Primitive(primitive));
        }

        if is_type_name(name) {
            Ok(TypeReference::Object(ObjectType::unattributed(name)))
        } else {
            Err(TypeError::UnknownType {
                name: name.to_string(),
            })
        }
    }

    pub fn message(name: impl Into<String>) -> Self {
        TypeReference::Object(ObjectType::message(name))
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        TypeReference::Object(ObjectType::enumeration(name))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeReference::Primitive(_))
    }

    pub fn name(&self) -> &str {
        match self {
            TypeReference::Primitive(primitive) => primitive.proto_name(),
            TypeReference::Object(object) => object.name(),
        }
    }

    pub fn wire_type(&self) -> WireType {
        match self {
            TypeReference::Primitive(primitive) => primitive.wire_type(),
            TypeReference::Object(object) => object.wire_type(),
        }
    }

    /// Whether repeated values of this type may use the packed encoding.
    pub fn is_packable(&self) -> bool {
        match self {
            TypeReference::Primitive(primitive) => primitive.is_packable(),
            TypeReference::Object(object) => object.kind() == ObjectKind::Enum,
        }
    }
}

impl From<PrimitiveType> for TypeReference {
    fn from(primitive: PrimitiveType) -> Self {
        TypeReference::Primitive(primitive)
    }
}

impl From<ObjectType> for TypeReference {
    fn from(object: ObjectType) -> Self {
        TypeReference::Object(object)
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `[.]ident(.ident)*` where `ident` is `[A-Za-z_][A-Za-z0-9_]*`.
fn is_type_name(name: &str) -> bool {
    let name = name.strip_prefix('.').unwrap_or(name);
    !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}
