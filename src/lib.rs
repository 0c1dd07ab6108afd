//! Schema directed dynamic decoding of protobuf wire data.
//!
//! A [`Schema`] describes host types (messages, enums and the container
//! types repeated fields are held in). A [`Decoder`] walks encoded bytes and,
//! whenever a length-delimited payload needs interpreting, asks a shared
//! [`DescriptorCache`] what the field number means in the current host type.
//! The result is a [`DecodedMap`] of field numbers to loosely typed values,
//! which can be dumped for diagnostics or converted into a user type.
//!
//! ```
//! use std::sync::Arc;
//! use protolens::{Decoder, DescriptorCache, FieldDecl, MessageType, PrimitiveType, Schema, Value};
//!
//! let schema = Schema::builder()
//!     .message(
//!         MessageType::new("Person")
//!             .field(FieldDecl::new("id", 1, PrimitiveType::Int64))
//!             .field(FieldDecl::new("name", 2, PrimitiveType::String)),
//!     )
//!     .build();
//! let decoder = Decoder::for_type(Arc::new(DescriptorCache::new(schema)), "Person").unwrap();
//!
//! let decoded = decoder.decode(&b"\x08\x01\x12\x03abc"[..]).unwrap();
//! assert_eq!(decoded.get(1), Some(&Value::Varint(1)));
//! assert_eq!(decoded.get(2), Some(&Value::Text("abc".to_string())));
//! ```

pub mod cache;
pub mod config;
pub mod convert;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod error;
// Publically export `leb128` because the functions are useful on their own.
pub mod leb128;
pub mod record;
pub mod schema;
pub mod types;
pub mod value;
pub mod wire;

mod util;

pub use crate::cache::{DescriptorCache, FieldDescriptor};
pub use crate::config::DecoderConfig;
pub use crate::cursor::ByteCursor;
pub use crate::decoder::Decoder;
pub use crate::encoder::{encode_map, encode_records};
pub use crate::error::{
    DecodeError, DecodeErrorKind, EncodeError, FramingError, ResolutionError, TypeError,
};
pub use crate::record::{FieldRecord, FieldValue, FromFieldValue};
pub use crate::schema::{
    ContainerRef, ContainerType, EnumType, FieldDecl, FieldShape, HostType, MessageType, Schema,
};
pub use crate::types::{ObjectKind, ObjectType, PrimitiveType, TypeReference};
pub use crate::util::{zigzag_decode_32, zigzag_decode_64, zigzag_encode_32, zigzag_encode_64};
pub use crate::value::{DecodedMap, Value};
