//! Record type specifications
//!
//! A [`RecordTypeSpec`] describes one resource, datatype or backbone element:
//! its fields in wire declaration order plus the backbone elements declared
//! inside it. Specs are immutable once built and shared read-only.

use crate::error::{Error, Result};
use crate::field::{FieldSpec, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCategory {
    /// Resource without narrative or contained resources (e.g. Bundle)
    Resource,
    /// Resource with narrative and contained resources
    DomainResource,
    /// Reusable complex datatype (e.g. Period, CodeableConcept)
    Datatype,
    /// Element type scoped to its containing resource (e.g. Bundle.Entry)
    Backbone,
}

impl TypeCategory {
    /// Top-level resources carry the `resourceType` discriminator
    pub fn is_resource(&self) -> bool {
        matches!(self, TypeCategory::Resource | TypeCategory::DomainResource)
    }
}

/// Resolved location of a wire key within a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WireSlot {
    field: usize,
    alternative: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RecordTypeSpec {
    name: String,
    category: TypeCategory,
    fields: Vec<FieldSpec>,
    backbones: Vec<RecordTypeSpec>,
    search_params: Vec<String>,
    by_name: HashMap<String, usize>,
    by_wire_key: HashMap<String, WireSlot>,
}

impl PartialEq for RecordTypeSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.category == other.category
            && self.fields == other.fields
            && self.backbones == other.backbones
            && self.search_params == other.search_params
    }
}

impl Eq for RecordTypeSpec {}

impl RecordTypeSpec {
    /// Build a spec, rejecting duplicate field names and colliding wire keys
    /// as well as bindings on fields that cannot carry codes.
    pub fn new(
        name: impl Into<String>,
        category: TypeCategory,
        fields: Vec<FieldSpec>,
    ) -> Result<Self> {
        let name = name.into();
        let mut by_name = HashMap::with_capacity(fields.len());
        let mut by_wire_key = HashMap::with_capacity(fields.len());

        for (index, field) in fields.iter().enumerate() {
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(Error::DuplicateField {
                    type_name: name.clone(),
                    field: field.name.clone(),
                });
            }

            if field.binding.is_some() && !field.kind.is_coded() {
                return Err(Error::InvalidDefinition {
                    path: field.path.clone(),
                    message: "binding declared on a field that does not carry codes".to_string(),
                });
            }

            let keys: Vec<(String, WireSlot)> = if field.is_choice() {
                field
                    .kind
                    .alternatives()
                    .iter()
                    .enumerate()
                    .map(|(alt, type_ref)| {
                        (
                            field.wire_key(Some(type_ref)),
                            WireSlot {
                                field: index,
                                alternative: Some(alt),
                            },
                        )
                    })
                    .collect()
            } else {
                vec![(
                    field.wire_key(None),
                    WireSlot {
                        field: index,
                        alternative: None,
                    },
                )]
            };

            for (key, slot) in keys {
                if by_wire_key.insert(key.clone(), slot).is_some() {
                    return Err(Error::DuplicateField {
                        type_name: name.clone(),
                        field: key,
                    });
                }
            }
        }

        Ok(Self {
            name,
            category,
            fields,
            backbones: Vec::new(),
            search_params: Vec::new(),
            by_name,
            by_wire_key,
        })
    }

    pub fn with_backbones(mut self, backbones: Vec<RecordTypeSpec>) -> Self {
        self.backbones = backbones;
        self
    }

    pub fn with_search_params(mut self, params: Vec<String>) -> Self {
        self.search_params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> TypeCategory {
        self.category
    }

    pub fn is_resource(&self) -> bool {
        self.category.is_resource()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    /// Backbone element types declared directly inside this type
    pub fn backbones(&self) -> &[RecordTypeSpec] {
        &self.backbones
    }

    pub fn search_params(&self) -> &[String] {
        &self.search_params
    }

    /// Resolve a wire key to its field and, for choice fields, the alternative
    /// the key's suffix selects (`performedPeriod` -> `performed`, `Period`).
    pub fn resolve_wire_key(&self, key: &str) -> Option<(&FieldSpec, Option<&TypeRef>)> {
        let slot = self.by_wire_key.get(key)?;
        let field = &self.fields[slot.field];
        let alternative = slot
            .alternative
            .and_then(|alt| field.kind.alternatives().get(alt));
        Some((field, alternative))
    }
}
