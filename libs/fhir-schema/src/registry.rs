//! Registry of record type specifications
//!
//! Built once from static definitions and read-only afterwards. Lookups hand
//! out `Arc`s so callers can hold on to a spec without borrowing the registry.

use crate::definition::TypeDefinition;
use crate::error::{Error, Result};
use crate::record::RecordTypeSpec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: HashMap<String, Arc<RecordTypeSpec>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record type together with the backbone elements nested in it.
    ///
    /// Fails with [`Error::DuplicateType`] if any of the names is already known;
    /// nothing is registered in that case.
    pub fn register(&mut self, spec: RecordTypeSpec) -> Result<()> {
        let backbones: Vec<RecordTypeSpec> = {
            let mut flattened = Vec::new();
            flatten(&spec, &mut flattened);

            let mut seen = HashSet::new();
            for candidate in &flattened {
                if self.types.contains_key(candidate.name()) || !seen.insert(candidate.name()) {
                    return Err(Error::DuplicateType(candidate.name().to_string()));
                }
            }

            flattened.into_iter().skip(1).cloned().collect()
        };
        tracing::debug!(
            type_name = spec.name(),
            fields = spec.fields().len(),
            backbones = backbones.len(),
            "registering record type"
        );

        for backbone in backbones {
            self.types
                .insert(backbone.name().to_string(), Arc::new(backbone));
        }
        self.types.insert(spec.name().to_string(), Arc::new(spec));
        Ok(())
    }

    /// Register a parsed declarative definition
    pub fn register_definition(&mut self, definition: &TypeDefinition) -> Result<()> {
        self.register(definition.to_spec()?)
    }

    /// Parse and register definitions from a JSON document holding either one
    /// definition object or an array of them.
    pub fn load_json(&mut self, input: &str) -> Result<usize> {
        let definitions = TypeDefinition::parse_many(input)?;
        for definition in &definitions {
            self.register_definition(definition)?;
        }
        Ok(definitions.len())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<RecordTypeSpec>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&RecordTypeSpec> {
        self.types.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names of all registered types, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Iterate over registered top-level resource types
    pub fn resource_types(&self) -> impl Iterator<Item = &RecordTypeSpec> {
        self.types
            .values()
            .map(Arc::as_ref)
            .filter(|spec| spec.is_resource())
    }

    /// Field paths whose declared type is not registered, as `(path, type)` pairs
    pub fn unresolved_references(&self) -> Vec<(String, String)> {
        let mut missing = Vec::new();
        for spec in self.types.values() {
            for field in spec.fields() {
                for type_name in field.kind.referenced_types() {
                    if !self.types.contains_key(type_name) {
                        missing.push((field.path.clone(), type_name.to_string()));
                    }
                }
            }
        }
        missing.sort();
        missing
    }

    /// Fail if any field refers to an unregistered type
    pub fn verify(&self) -> Result<()> {
        match self.unresolved_references().into_iter().next() {
            Some((path, type_name)) => Err(Error::UnresolvedType { path, type_name }),
            None => Ok(()),
        }
    }
}

fn flatten<'a>(spec: &'a RecordTypeSpec, out: &mut Vec<&'a RecordTypeSpec>) {
    out.push(spec);
    for backbone in spec.backbones() {
        flatten(backbone, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Cardinality, FieldKind, FieldSpec, PrimitiveType};
    use crate::record::TypeCategory;

    fn bundle_spec() -> RecordTypeSpec {
        let entry = RecordTypeSpec::new(
            "Bundle.Entry",
            TypeCategory::Backbone,
            vec![FieldSpec::new(
                "fullUrl",
                "Bundle.entry.fullUrl",
                Cardinality::OPTIONAL,
                FieldKind::Primitive(PrimitiveType::Uri),
            )],
        )
        .unwrap();

        RecordTypeSpec::new(
            "Bundle",
            TypeCategory::Resource,
            vec![FieldSpec::new(
                "entry",
                "Bundle.entry",
                Cardinality::MANY,
                FieldKind::Record("Bundle.Entry".into()),
            )],
        )
        .unwrap()
        .with_backbones(vec![entry])
    }

    #[test]
    fn registers_backbones_with_their_parent() {
        let mut registry = SchemaRegistry::new();
        registry.register(bundle_spec()).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("Bundle").is_ok());
        assert_eq!(registry.lookup("Bundle.Entry").unwrap().fields().len(), 1);
        assert!(registry.verify().is_ok());
    }

    #[test]
    fn duplicate_registration_fails_without_side_effects() {
        let mut registry = SchemaRegistry::new();
        registry.register(bundle_spec()).unwrap();

        let err = registry.register(bundle_spec()).unwrap_err();
        assert!(matches!(err, Error::DuplicateType(name) if name == "Bundle.Entry" || name == "Bundle"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_of_unknown_type_fails() {
        let registry = SchemaRegistry::new();
        let err = registry.lookup("Patient").unwrap_err();
        assert!(matches!(err, Error::UnknownType(name) if name == "Patient"));
    }

    #[test]
    fn reports_unresolved_references() {
        let mut registry = SchemaRegistry::new();
        let spec = RecordTypeSpec::new(
            "Device",
            TypeCategory::DomainResource,
            vec![FieldSpec::new(
                "type",
                "Device.type",
                Cardinality::OPTIONAL,
                FieldKind::Record("CodeableConcept".into()),
            )],
        )
        .unwrap();
        registry.register(spec).unwrap();

        assert_eq!(
            registry.unresolved_references(),
            vec![("Device.type".to_string(), "CodeableConcept".to_string())]
        );
        assert!(matches!(
            registry.verify(),
            Err(Error::UnresolvedType { .. })
        ));
    }
}
