//! Declarative type definitions
//!
//! Record types are described as data, in a compact JSON form modeled on FHIR
//! ElementDefinitions, and turned into [`RecordTypeSpec`]s when loaded:
//!
//! ```json
//! {
//!   "name": "Procedure",
//!   "kind": "resource",
//!   "elements": [
//!     { "name": "status", "card": "1..1", "type": ["code"],
//!       "binding": { "strength": "required", "codes": ["completed"] } },
//!     { "name": "performed[x]", "card": "0..1", "type": ["dateTime", "Period"] },
//!     { "name": "focalDevice", "card": "0..*", "elements": [
//!       { "name": "manipulated", "card": "1..1", "type": ["Reference"], "targets": ["Device"] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Standard elements are injected while loading: resources get `id`, `meta`,
//! `implicitRules` and `language`, domain resources additionally `text` and
//! `contained`, datatypes and backbone elements an `id` carried as an XML
//! attribute. Extensions are not declared and travel as unknown content.

use crate::binding::ValueSetBinding;
use crate::error::{Error, Result};
use crate::field::{Cardinality, FieldKind, FieldSpec, PrimitiveType, TypeRef};
use crate::record::{RecordTypeSpec, TypeCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level definition of a resource or datatype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub name: String,

    pub kind: DefinitionKind,

    /// `Resource` or `DomainResource` (default) for resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// Names of the search parameters defined for the resource
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub search_params: Vec<String>,

    pub elements: Vec<ElementDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Resource,
    Datatype,
}

/// Definition of one element; backbone elements nest their own `elements`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    /// Element name, choice elements end in `[x]`
    pub name: String,

    /// Cardinality as `min..max`
    pub card: String,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    /// Target resource types for `Reference` elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<ValueSetBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<ElementDefinition>>,

    /// Reuse of a backbone element declared elsewhere (`#RequestGroup.Action`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_reference: Option<String>,
}

impl TypeDefinition {
    /// Parse a JSON document holding a single definition or an array of them
    pub fn parse_many(input: &str) -> Result<Vec<TypeDefinition>> {
        let value: Value = serde_json::from_str(input)?;
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| serde_json::from_value(item).map_err(Error::from))
                .collect(),
            other => Ok(vec![serde_json::from_value(other)?]),
        }
    }

    pub fn category(&self) -> Result<TypeCategory> {
        match (self.kind, self.base.as_deref()) {
            (DefinitionKind::Datatype, None) => Ok(TypeCategory::Datatype),
            (DefinitionKind::Resource, None | Some("DomainResource")) => {
                Ok(TypeCategory::DomainResource)
            }
            (DefinitionKind::Resource, Some("Resource")) => Ok(TypeCategory::Resource),
            (_, Some(other)) => Err(Error::InvalidDefinition {
                path: self.name.clone(),
                message: format!("unsupported base '{}'", other),
            }),
        }
    }

    /// Build the record type spec, including specs for nested backbone elements
    pub fn to_spec(&self) -> Result<RecordTypeSpec> {
        let category = self.category()?;
        let mut fields = standard_fields(&self.name, category);
        let mut backbones = Vec::new();

        for element in &self.elements {
            fields.push(build_field(&self.name, &self.name, element, &mut backbones)?);
        }

        Ok(RecordTypeSpec::new(&self.name, category, fields)?
            .with_backbones(backbones)
            .with_search_params(self.search_params.clone()))
    }
}

fn standard_fields(type_name: &str, category: TypeCategory) -> Vec<FieldSpec> {
    let field = |name: &str, card: Cardinality, kind: FieldKind| {
        FieldSpec::new(name, format!("{}.{}", type_name, name), card, kind)
    };

    match category {
        TypeCategory::Resource | TypeCategory::DomainResource => {
            let mut fields = vec![
                field(
                    "id",
                    Cardinality::OPTIONAL,
                    FieldKind::Primitive(PrimitiveType::Id),
                ),
                field(
                    "meta",
                    Cardinality::OPTIONAL,
                    FieldKind::Record("Meta".to_string()),
                ),
                field(
                    "implicitRules",
                    Cardinality::OPTIONAL,
                    FieldKind::Primitive(PrimitiveType::Uri),
                ),
                field(
                    "language",
                    Cardinality::OPTIONAL,
                    FieldKind::Primitive(PrimitiveType::Code),
                ),
            ];
            if category == TypeCategory::DomainResource {
                fields.push(field(
                    "text",
                    Cardinality::OPTIONAL,
                    FieldKind::Record("Narrative".to_string()),
                ));
                fields.push(field("contained", Cardinality::MANY, FieldKind::Resource));
            }
            fields
        }
        TypeCategory::Datatype | TypeCategory::Backbone => vec![field(
            "id",
            Cardinality::OPTIONAL,
            FieldKind::Primitive(PrimitiveType::String),
        )
        .as_xml_attribute()],
    }
}

fn build_field(
    owner_type: &str,
    owner_path: &str,
    element: &ElementDefinition,
    backbones: &mut Vec<RecordTypeSpec>,
) -> Result<FieldSpec> {
    let path = format!("{}.{}", owner_path, element.name);
    let invalid = |message: &str| Error::InvalidDefinition {
        path: path.clone(),
        message: message.to_string(),
    };

    let (name, is_choice) = match element.name.strip_suffix("[x]") {
        Some(base) => (base.to_string(), true),
        None => (element.name.clone(), false),
    };
    if name.is_empty() {
        return Err(invalid("empty element name"));
    }

    let cardinality: Cardinality = element.card.parse()?;

    let kind = if let Some(reference) = &element.content_reference {
        let target = reference.trim_start_matches('#');
        if target.is_empty() {
            return Err(invalid("empty content reference"));
        }
        FieldKind::Record(target.to_string())
    } else if let Some(children) = &element.elements {
        let backbone_name = format!("{}.{}", owner_type, pascal_case(&name));
        let element_path = format!("{}.{}", owner_path, name);

        let mut fields = standard_fields(&backbone_name, TypeCategory::Backbone);
        let mut nested = Vec::new();
        for child in children {
            fields.push(build_field(&backbone_name, &element_path, child, &mut nested)?);
        }
        backbones.push(
            RecordTypeSpec::new(&backbone_name, TypeCategory::Backbone, fields)?
                .with_backbones(nested),
        );
        FieldKind::Record(backbone_name)
    } else if is_choice {
        if element.types.len() < 2 {
            return Err(invalid("choice element needs at least two types"));
        }
        FieldKind::Choice(element.types.iter().map(|t| TypeRef::from_code(t)).collect())
    } else {
        match element.types.as_slice() {
            [single] => match single.as_str() {
                "Resource" => FieldKind::Resource,
                "Reference" => FieldKind::Reference(element.targets.clone()),
                other => match PrimitiveType::from_name(other) {
                    Some(primitive) => FieldKind::Primitive(primitive),
                    None => FieldKind::Record(other.to_string()),
                },
            },
            [] => return Err(invalid("element has no type")),
            _ => return Err(invalid("multiple types on a non-choice element")),
        }
    };

    let mut field = FieldSpec::new(name, path, cardinality, kind);
    if let Some(binding) = &element.binding {
        field = field.with_binding(binding.clone());
    }
    Ok(field)
}

fn pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
