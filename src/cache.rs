//! Memoized field resolution.
//!
//! Resolving what a field number means inside a host type requires walking
//! the host's parent chain, looking at overrides and, for repeated fields
//! held in named containers, walking the container hierarchy. None of that
//! changes once a [`Schema`] is built, so both the member lists and the
//! resolved descriptors are computed once and kept for the lifetime of the
//! cache. Only declared fields are kept: unknown numbers come from the input,
//! not the schema, and are looked up against the cached member list instead.
//!
//! The cache is meant to be shared between threads behind an [`Arc`]. Two
//! threads racing to fill the same entry compute the same value, whichever
//! insert lands first is kept.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ResolutionError;
use crate::schema::{ContainerRef, FieldShape, Member, Schema};
use crate::types::TypeReference;

/// What a field number resolves to inside a host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    field: String,
    ty: TypeReference,
    packed: bool,
}

impl FieldDescriptor {
    /// Name of the member the field number matched.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The attributed type payloads of this field decode to.
    pub fn ty(&self) -> &TypeReference {
        &self.ty
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }
}

/// Process-wide resolution cache for one [`Schema`].
#[derive(Debug)]
pub struct DescriptorCache {
    schema: Arc<Schema>,
    members: RwLock<HashMap<String, Arc<[Member]>>>,
    descriptors: RwLock<HashMap<String, HashMap<u32, Arc<FieldDescriptor>>>>,
}

impl DescriptorCache {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        DescriptorCache {
            schema: schema.into(),
            members: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Resolves `field_number` against the members of `host`.
    ///
    /// Returns `Ok(None)` when no member of `host` carries that number.
    pub fn resolve(
        &self,
        host: &str,
        field_number: u32,
    ) -> Result<Option<Arc<FieldDescriptor>>, ResolutionError> {
        if let Some(cached) = self
            .descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .and_then(|fields| fields.get(&field_number))
        {
            return Ok(Some(Arc::clone(cached)));
        }

        let Some(resolved) = self.compute(host, field_number)? else {
            return Ok(None);
        };
        tracing::trace!(host, field_number, ?resolved, "caching field descriptor");

        let mut descriptors = self
            .descriptors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let cached = descriptors
            .entry(host.to_string())
            .or_default()
            .entry(field_number)
            .or_insert_with(|| Arc::new(resolved));
        Ok(Some(Arc::clone(cached)))
    }

    #[cfg(test)]
    pub(crate) fn cached_descriptors(&self) -> usize {
        self.descriptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// The members of `host` including inherited ones, walked once.
    pub fn members(&self, host: &str) -> Result<Arc<[Member]>, ResolutionError> {
        if let Some(cached) = self
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
        {
            return Ok(Arc::clone(cached));
        }

        let members: Arc<[Member]> = self.schema.declared_members(host)?.into();
        let mut cache = self.members.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            cache.entry(host.to_string()).or_insert(members),
        ))
    }

    fn compute(
        &self,
        host: &str,
        field_number: u32,
    ) -> Result<Option<FieldDescriptor>, ResolutionError> {
        let members = self.members(host)?;

        // Every member is checked, a type descriptor is unusable as soon as
        // one member of its message lacks an index.
        let mut matched = None;
        for member in members.iter() {
            let declaring = self.schema.message(&member.declared_by)?;
            match member.field.index() {
                None if declaring.has_type_descriptor() => {
                    return Err(ResolutionError::MissingFieldIndex {
                        host: member.declared_by.clone(),
                        field: member.field.name().to_string(),
                    });
                }
                Some(index) if index == field_number && matched.is_none() => {
                    matched = Some((member, declaring));
                }
                _ => {}
            }
        }
        let Some((member, declaring)) = matched else {
            return Ok(None);
        };
        let field = &member.field;

        let ty = if declaring.has_type_descriptor() {
            declaring
                .descriptor_entry(field_number)
                .cloned()
                .ok_or_else(|| ResolutionError::MissingDescriptorEntry {
                    host: member.declared_by.clone(),
                    index: field_number,
                })?
        } else if let Some(explicit) = field.type_override() {
            explicit.clone()
        } else {
            let inferred = self.schema.attribute(&self.infer(host, member)?)?;
            match self.schema.substitute_of(&inferred) {
                Some(substitute) => substitute.clone(),
                None => inferred,
            }
        };
        let ty = self.schema.attribute(&ty)?;

        let packed = field.is_packed();
        if packed && !ty.is_packable() {
            return Err(ResolutionError::PackedNonScalar {
                host: member.declared_by.clone(),
                field: field.name().to_string(),
            });
        }

        Ok(Some(FieldDescriptor {
            field: field.name().to_string(),
            ty,
            packed,
        }))
    }

    /// The element type a field's declared shape implies.
    fn infer(&self, host: &str, member: &Member) -> Result<TypeReference, ResolutionError> {
        match member.field.shape() {
            FieldShape::Single(ty) | FieldShape::Repeated(ContainerRef::Parameterized(ty)) => {
                Ok(ty.clone())
            }
            FieldShape::Repeated(ContainerRef::Named(container)) => self
                .schema
                .container_element(container)?
                .cloned()
                .ok_or_else(|| ResolutionError::UnresolvedElementType {
                    host: host.to_string(),
                    field: member.field.name().to_string(),
                }),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::schema::{ContainerType, EnumType, FieldDecl, MessageType};
    use crate::types::PrimitiveType;

    fn cache() -> DescriptorCache {
        let schema = Schema::builder()
            .message(
                MessageType::new("Base")
                    .field(FieldDecl::new("id", 1, PrimitiveType::Int64)),
            )
            .message(
                MessageType::new("Person")
                    .extends("Base")
                    .field(FieldDecl::new("name", 2, PrimitiveType::String))
                    .field(FieldDecl::repeated("scores", 3, PrimitiveType::Fixed32).packed())
                    .field(FieldDecl::repeated_in("friends", 4, "PersonList"))
                    .field(
                        FieldDecl::new("avatar", 5, PrimitiveType::String)
                            .override_type(PrimitiveType::Bytes.into()),
                    )
                    .field(FieldDecl::new("stamp", 6, TypeReference::message("Timestamp")))
                    .field(FieldDecl::repeated_in("tags", 7, "RawList"))
                    .field(FieldDecl::new("color", 8, TypeReference::of("Color").unwrap())),
            )
            .message(
                MessageType::new("Timestamp")
                    .field(FieldDecl::new("seconds", 1, PrimitiveType::Int64))
                    .substitute(PrimitiveType::String.into()),
            )
            .message(
                MessageType::new("Described")
                    .field(FieldDecl::new("a", 1, PrimitiveType::Int32))
                    .field(FieldDecl::new("b", 2, PrimitiveType::Int32))
                    .type_descriptor([(1, TypeReference::message("Person"))]),
            )
            .message(
                MessageType::new("Broken")
                    .field(FieldDecl::new("a", 1, PrimitiveType::Int32))
                    .field(FieldDecl::unindexed("b", PrimitiveType::Int32))
                    .type_descriptor([(1, PrimitiveType::Bytes.into())]),
            )
            .message(
                MessageType::new("BadPacked")
                    .field(FieldDecl::repeated("names", 1, PrimitiveType::String).packed()),
            )
            .enumeration(EnumType::new("Color"))
            .container(ContainerType::new("AbstractList").of(TypeReference::of("Person").unwrap()))
            .container(ContainerType::new("PersonList").extends("AbstractList"))
            .container(ContainerType::new("RawList"))
            .build();
        DescriptorCache::new(schema)
    }

    #[track_caller]
    fn resolved(cache: &DescriptorCache, host: &str, number: u32) -> (TypeReference, bool) {
        let descriptor = cache.resolve(host, number).unwrap().expect("field exists");
        (descriptor.ty().clone(), descriptor.is_packed())
    }

    #[test]
    fn test_resolve_declared_type() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 2),
            (PrimitiveType::String.into(), false)
        );
    }

    #[test]
    fn test_resolve_inherited_field() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 1),
            (PrimitiveType::Int64.into(), false)
        );
    }

    #[test]
    fn test_resolve_packed() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 3),
            (PrimitiveType::Fixed32.into(), true)
        );
    }

    #[test]
    fn test_resolve_through_container_hierarchy() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 4),
            (TypeReference::message("Person"), false)
        );
    }

    #[test]
    fn test_resolve_field_override() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 5),
            (PrimitiveType::Bytes.into(), false)
        );
    }

    #[test]
    fn test_resolve_element_substitute() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 6),
            (PrimitiveType::String.into(), false)
        );
    }

    #[test]
    fn test_resolve_enum() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Person", 8),
            (TypeReference::enumeration("Color"), false)
        );
    }

    #[test]
    fn test_resolve_unknown_field() {
        let cache = cache();
        assert_eq!(cache.resolve("Person", 99).unwrap(), None);
    }

    #[test]
    fn test_unknown_fields_are_not_cached() {
        let cache = cache();
        resolved(&cache, "Person", 2);
        for number in 100..1_100 {
            assert_eq!(cache.resolve("Person", number).unwrap(), None);
        }
        assert_eq!(cache.cached_descriptors(), 1);

        // Still answered from the cache once populated.
        let first = cache.resolve("Person", 2).unwrap().unwrap();
        let second = cache.resolve("Person", 2).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_resolve_unresolvable_container() {
        let cache = cache();
        assert_eq!(
            cache.resolve("Person", 7),
            Err(ResolutionError::UnresolvedElementType {
                host: "Person".to_string(),
                field: "tags".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_type_descriptor() {
        let cache = cache();
        assert_eq!(
            resolved(&cache, "Described", 1),
            (TypeReference::message("Person"), false)
        );
        assert_eq!(
            cache.resolve("Described", 2),
            Err(ResolutionError::MissingDescriptorEntry {
                host: "Described".to_string(),
                index: 2,
            })
        );
    }

    #[test]
    fn test_resolve_type_descriptor_requires_index() {
        let cache = cache();
        assert_eq!(
            cache.resolve("Broken", 1),
            Err(ResolutionError::MissingFieldIndex {
                host: "Broken".to_string(),
                field: "b".to_string(),
            })
        );
    }

    #[test]
    fn test_resolve_packed_non_scalar() {
        let cache = cache();
        assert!(matches!(
            cache.resolve("BadPacked", 1),
            Err(ResolutionError::PackedNonScalar { .. })
        ));
    }

    #[test]
    fn test_resolve_unknown_host() {
        let cache = cache();
        assert!(matches!(
            cache.resolve("Nope", 1),
            Err(ResolutionError::UnknownHostType { .. })
        ));
    }

    #[test]
    fn test_members_are_cached() {
        let cache = cache();
        let first = cache.members("Person").unwrap();
        let second = cache.members("Person").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn test_concurrent_resolution_is_deterministic() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (1..=8)
                        .map(|number| cache.resolve("Person", number).ok().flatten())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
    }
}
