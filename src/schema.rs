//! Host type model.
//!
//! A [`Schema`] is the structural description of the types decoded values are
//! destined for. Each message lists its fields with their wire index, declared
//! shape and optional type overrides; the decoder consults it through the
//! [`crate::cache::DescriptorCache`] to decide how to interpret
//! length-delimited payloads.
//!
//! Types refer to each other by name so that recursive messages can be
//! described, references are attributed lazily with [`Schema::attribute`].

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::ResolutionError;
use crate::types::{ObjectKind, TypeReference};

/// Marker looked for in a field description to enable the packed encoding.
pub const PACKED_MARKER: &str = "[packed]";

/// A registered collection of host types.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    hosts: HashMap<String, HostType>,
}

/// A named type known to a [`Schema`].
#[derive(Debug, Clone)]
pub enum HostType {
    Message(MessageType),
    Enum(EnumType),
    Container(ContainerType),
}

impl HostType {
    pub fn name(&self) -> &str {
        match self {
            HostType::Message(message) => &message.name,
            HostType::Enum(enumeration) => &enumeration.name,
            HostType::Container(container) => &container.name,
        }
    }
}

/// A message: an ordered list of fields, optionally extending another message.
#[derive(Debug, Clone)]
pub struct MessageType {
    name: String,
    parent: Option<String>,
    fields: Vec<FieldDecl>,
    type_descriptor: Option<BTreeMap<u32, TypeReference>>,
    type_override: Option<TypeReference>,
}

impl MessageType {
    pub fn new(name: impl Into<String>) -> Self {
        MessageType {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            type_descriptor: None,
            type_override: None,
        }
    }

    /// Inherit the fields of `parent`.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    /// Attach a static table from wire index to element type.
    ///
    /// When present the table is authoritative for every field declared by
    /// this message, and every such field must declare its wire index.
    pub fn type_descriptor(
        mut self,
        entries: impl IntoIterator<Item = (u32, TypeReference)>,
    ) -> Self {
        self.type_descriptor = Some(entries.into_iter().collect());
        self
    }

    /// Fields typed as this message decode as `substitute` instead.
    pub fn substitute(mut self, substitute: TypeReference) -> Self {
        self.type_override = Some(substitute);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Fields declared directly on this message, inherited ones excluded.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn descriptor_entry(&self, index: u32) -> Option<&TypeReference> {
        self.type_descriptor.as_ref()?.get(&index)
    }

    pub fn has_type_descriptor(&self) -> bool {
        self.type_descriptor.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct EnumType {
    name: String,
    type_override: Option<TypeReference>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        EnumType {
            name: name.into(),
            type_override: None,
        }
    }

    pub fn substitute(mut self, substitute: TypeReference) -> Self {
        self.type_override = Some(substitute);
        self
    }
}

/// A named collection type, e.g. a `PersonList` that holds `Person`s.
///
/// The element type may be left implicit, in which case it is inherited from
/// the `parent` container.
#[derive(Debug, Clone)]
pub struct ContainerType {
    name: String,
    element: Option<TypeReference>,
    parent: Option<String>,
}

impl ContainerType {
    pub fn new(name: impl Into<String>) -> Self {
        ContainerType {
            name: name.into(),
            element: None,
            parent: None,
        }
    }

    pub fn of(mut self, element: TypeReference) -> Self {
        self.element = Some(element);
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// The declared shape of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    Single(TypeReference),
    Repeated(ContainerRef),
}

/// How a repeated field names its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerRef {
    /// Generic container with a visible element type, `Vec<T>`.
    Parameterized(TypeReference),
    /// A named [`ContainerType`], element type found through its hierarchy.
    Named(String),
}

/// A member of a [`MessageType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    name: String,
    index: Option<u32>,
    shape: FieldShape,
    type_override: Option<TypeReference>,
    description: Option<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, index: u32, ty: impl Into<TypeReference>) -> Self {
        FieldDecl::with_shape(name, Some(index), FieldShape::Single(ty.into()))
    }

    pub fn repeated(name: impl Into<String>, index: u32, element: impl Into<TypeReference>) -> Self {
        let shape = FieldShape::Repeated(ContainerRef::Parameterized(element.into()));
        FieldDecl::with_shape(name, Some(index), shape)
    }

    /// Repeated field held in the named [`ContainerType`].
    pub fn repeated_in(
        name: impl Into<String>,
        index: u32,
        container: impl Into<String>,
    ) -> Self {
        let shape = FieldShape::Repeated(ContainerRef::Named(container.into()));
        FieldDecl::with_shape(name, Some(index), shape)
    }

    /// A member that has no wire index, it is never matched while decoding.
    pub fn unindexed(name: impl Into<String>, ty: impl Into<TypeReference>) -> Self {
        FieldDecl::with_shape(name, None, FieldShape::Single(ty.into()))
    }

    pub fn with_shape(name: impl Into<String>, index: Option<u32>, shape: FieldShape) -> Self {
        FieldDecl {
            name: name.into(),
            index,
            shape,
            type_override: None,
            description: None,
        }
    }

    /// Decode this field as `ty` regardless of its declared shape.
    pub fn override_type(mut self, ty: TypeReference) -> Self {
        self.type_override = Some(ty);
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Shorthand for appending [`PACKED_MARKER`] to the description.
    pub fn packed(self) -> Self {
        let description = match &self.description {
            Some(existing) => format!("{existing} {PACKED_MARKER}"),
            None => PACKED_MARKER.to_string(),
        };
        self.describe(description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn shape(&self) -> &FieldShape {
        &self.shape
    }

    pub fn type_override(&self) -> Option<&TypeReference> {
        self.type_override.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_packed(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|description| description.contains(PACKED_MARKER))
    }
}

/// A field together with the message that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub declared_by: String,
    pub field: FieldDecl,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&HostType> {
        self.hosts.get(normalize(name))
    }

    pub fn message(&self, name: &str) -> Result<&MessageType, ResolutionError> {
        match self.get(name) {
            Some(HostType::Message(message)) => Ok(message),
            _ => Err(unknown_host(name)),
        }
    }

    /// Looks the named type of `reference` up, returning it with its kind
    /// filled in. Primitive references are returned unchanged.
    pub fn attribute(&self, reference: &TypeReference) -> Result<TypeReference, ResolutionError> {
        let TypeReference::Object(object) = reference else {
            return Ok(reference.clone());
        };

        match self.get(object.name()) {
            Some(HostType::Message(message)) => Ok(TypeReference::message(message.name())),
            Some(HostType::Enum(enumeration)) => Ok(TypeReference::enumeration(&enumeration.name)),
            Some(HostType::Container(container)) => Err(ResolutionError::NotAFieldType {
                name: container.name.clone(),
            }),
            None => Err(unknown_host(object.name())),
        }
    }

    /// The substitute registered for an attributed message or enum type.
    pub fn substitute_of(&self, reference: &TypeReference) -> Option<&TypeReference> {
        let TypeReference::Object(object) = reference else {
            return None;
        };
        match (object.kind(), self.get(object.name())?) {
            (ObjectKind::Message, HostType::Message(message)) => message.type_override.as_ref(),
            (ObjectKind::Enum, HostType::Enum(enumeration)) => enumeration.type_override.as_ref(),
            _ => None,
        }
    }

    /// Every member of `host`, its own fields first followed by those
    /// inherited through its parent chain.
    ///
    /// Enums have no members.
    pub fn declared_members(&self, host: &str) -> Result<Vec<Member>, ResolutionError> {
        let mut members = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(host);

        while let Some(name) = current {
            if !visited.insert(normalize(name)) {
                return Err(ResolutionError::CyclicHierarchy {
                    name: host.to_string(),
                });
            }

            match self.get(name) {
                Some(HostType::Message(message)) => {
                    members.extend(message.fields.iter().map(|field| Member {
                        declared_by: message.name.clone(),
                        field: field.clone(),
                    }));
                    current = message.parent.as_deref();
                }
                Some(HostType::Enum(_)) if name == host => current = None,
                _ => return Err(unknown_host(name)),
            }
        }

        Ok(members)
    }

    /// Walks the container hierarchy starting at `container` until an
    /// explicit element type is found.
    ///
    /// Returns `Ok(None)` when the chain ends without one.
    pub fn container_element(
        &self,
        container: &str,
    ) -> Result<Option<&TypeReference>, ResolutionError> {
        let mut visited = HashSet::new();
        let mut current = Some(container);

        while let Some(name) = current {
            if !visited.insert(normalize(name)) {
                return Err(ResolutionError::CyclicHierarchy {
                    name: container.to_string(),
                });
            }
            let Some(HostType::Container(found)) = self.get(name) else {
                return Err(unknown_host(name));
            };
            if let Some(element) = &found.element {
                return Ok(Some(element));
            }
            current = found.parent.as_deref();
        }

        Ok(None)
    }
}

/// Collects host types into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    hosts: HashMap<String, HostType>,
}

impl SchemaBuilder {
    pub fn message(self, message: MessageType) -> Self {
        self.host(HostType::Message(message))
    }

    pub fn enumeration(self, enumeration: EnumType) -> Self {
        self.host(HostType::Enum(enumeration))
    }

    pub fn container(self, container: ContainerType) -> Self {
        self.host(HostType::Container(container))
    }

    /// Registers a host type, replacing any earlier type of the same name.
    pub fn host(mut self, host: HostType) -> Self {
        self.hosts.insert(normalize(host.name()).to_string(), host);
        self
    }

    pub fn build(self) -> Schema {
        Schema { hosts: self.hosts }
    }
}

/// Fully qualified names may be written with a leading dot.
fn normalize(name: &str) -> &str {
    name.strip_prefix('.').unwrap_or(name)
}

fn unknown_host(name: &str) -> ResolutionError {
    ResolutionError::UnknownHostType {
        name: name.to_string(),
    }
}
