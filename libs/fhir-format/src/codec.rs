//! Format-independent parts of the codecs
//!
//! Both wire formats lay a record out the same way: declared fields in spec
//! order, primitive metadata next to the primitive it belongs to, extensions
//! where FHIR places them and other unknown content last. [`layout`] computes
//! that order once and checks the record against its spec on the way.

use crate::error::{FormatError, Result};
use ferrum_models::{alternative_kind, TypedRecord, Value};
use ferrum_schema::{FieldKind, FieldSpec, RecordTypeSpec, SchemaRegistry, TypeCategory, TypeRef};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::Arc;

/// Output formatting for the encoders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Pretty-print the output
    pub pretty: bool,
    /// Indentation width used when pretty-printing
    pub indent: usize,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: 2,
        }
    }
}

impl CodecOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}

/// Capability shared by the JSON and XML codecs
pub trait WireCodec {
    /// Name of the wire format, for diagnostics
    fn format(&self) -> &'static str;

    /// Decode a resource document, resolving its type from the document
    fn decode_str(&self, input: &str) -> Result<TypedRecord>;

    /// Decode a document as an instance of `spec`
    fn decode_str_as(&self, input: &str, spec: &RecordTypeSpec) -> Result<TypedRecord>;

    /// Encode a record using the spec registered for its type
    fn encode_string(&self, record: &TypedRecord) -> Result<String>;
}

/// Extensions that FHIR places ahead of the type's own elements
pub(crate) const EXTENSION_KEYS: [&str; 2] = ["extension", "modifierExtension"];

/// Field after which extensions are written, `None` to write them last
pub(crate) fn extension_anchor(spec: &RecordTypeSpec) -> Option<&'static str> {
    match spec.category() {
        TypeCategory::DomainResource => Some("contained"),
        TypeCategory::Datatype | TypeCategory::Backbone => Some("id"),
        TypeCategory::Resource => None,
    }
}

/// Location of field `name` below `parent`, indexed for repeating fields
pub(crate) fn child_path(parent: &str, name: &str, index: Option<usize>) -> String {
    match index {
        Some(index) => format!("{}.{}[{}]", parent, name, index),
        None => format!("{}.{}", parent, name),
    }
}

/// Populated field in wire form
#[derive(Debug)]
pub(crate) struct Slot<'a> {
    pub field: &'a FieldSpec,
    pub wire_key: String,
    pub kind: Cow<'a, FieldKind>,
    /// Occurrences, with choice wrappers removed
    pub values: Vec<&'a Value>,
    /// `_field` metadata (element id and extensions) of a primitive field
    pub metadata: Option<&'a JsonValue>,
}

#[derive(Debug)]
pub(crate) enum Entry<'a> {
    Field(Slot<'a>),
    Extra(&'a str, &'a JsonValue),
}

/// Order a record's content for output, failing on content that the spec
/// does not admit.
pub(crate) fn layout<'a>(
    record: &'a TypedRecord,
    spec: &'a RecordTypeSpec,
    path: &str,
) -> Result<Vec<Entry<'a>>> {
    if let Some(unknown) = record.field_names().find(|name| spec.field(name).is_none()) {
        return Err(FormatError::mismatch(
            child_path(path, unknown, None),
            format!("a field of {}", spec.name()),
            "undeclared field",
        ));
    }

    let anchor = extension_anchor(spec);
    let mut consumed: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for field in spec.fields() {
        if let Some(slot) = field_slot(record, field, path)? {
            if slot.metadata.is_some() {
                consumed.insert(format!("_{}", slot.wire_key));
            }
            entries.push(Entry::Field(slot));
        } else if let Some(slot) = metadata_only_slot(record, field) {
            consumed.insert(format!("_{}", slot.wire_key));
            entries.push(Entry::Field(slot));
        }

        if anchor == Some(field.name.as_str()) {
            for key in EXTENSION_KEYS {
                if let Some(value) = record.extra(key) {
                    consumed.insert(key.to_string());
                    entries.push(Entry::Extra(key, value));
                }
            }
        }
    }

    for (key, value) in record.extras() {
        if !consumed.contains(key) {
            entries.push(Entry::Extra(key.as_str(), value));
        }
    }

    Ok(entries)
}

fn field_slot<'a>(
    record: &'a TypedRecord,
    field: &'a FieldSpec,
    path: &str,
) -> Result<Option<Slot<'a>>> {
    let occurrences = record.get(&field.name);
    if occurrences.is_empty() {
        return Ok(None);
    }

    let (alternative, values): (Option<&'a TypeRef>, Vec<&'a Value>) = if field.is_choice() {
        let mut codes: Vec<&str> = Vec::new();
        let mut values = Vec::with_capacity(occurrences.len());
        for (index, value) in occurrences.iter().enumerate() {
            let Some(choice) = value.as_choice() else {
                return Err(FormatError::mismatch(
                    occurrence_path(path, field, index),
                    field.kind.to_string(),
                    value.describe(),
                ));
            };
            if !codes.contains(&choice.type_code.as_str()) {
                codes.push(&choice.type_code);
            }
            values.push(choice.value.as_ref());
        }

        if codes.len() > 1 {
            return Err(FormatError::ConflictingChoice {
                path: child_path(path, &field.name, None),
                alternatives: codes
                    .iter()
                    .map(|code| format!("{}{}", field.name, TypeRef::from_code(code).suffix()))
                    .collect(),
            });
        }

        match field.alternative(codes[0]) {
            Some(alternative) => (Some(alternative), values),
            None => {
                return Err(FormatError::mismatch(
                    child_path(path, &field.name, None),
                    field.kind.to_string(),
                    codes[0],
                ))
            }
        }
    } else {
        (None, occurrences.iter().collect())
    };

    if !field.is_repeating() && values.len() > 1 {
        return Err(FormatError::mismatch(
            child_path(path, &field.name, None),
            "a single value",
            format!("{} values", values.len()),
        ));
    }

    let kind = match alternative {
        Some(alternative) => Cow::Owned(alternative_kind(alternative)),
        None => Cow::Borrowed(&field.kind),
    };
    for (index, value) in values.iter().enumerate() {
        if !value.conforms_to(&kind) {
            return Err(FormatError::mismatch(
                occurrence_path(path, field, index),
                kind.to_string(),
                value.describe(),
            ));
        }
    }

    let wire_key = field.wire_key(alternative);
    let metadata = match kind.as_ref() {
        FieldKind::Primitive(_) => record.extra(&format!("_{}", wire_key)),
        _ => None,
    };

    Ok(Some(Slot {
        field,
        wire_key,
        kind,
        values,
        metadata,
    }))
}

/// Primitive that carries only an id or extensions and no value
fn metadata_only_slot<'a>(record: &'a TypedRecord, field: &'a FieldSpec) -> Option<Slot<'a>> {
    let candidates: Vec<(String, Cow<'a, FieldKind>)> = match &field.kind {
        FieldKind::Primitive(_) => vec![(field.wire_key(None), Cow::Borrowed(&field.kind))],
        FieldKind::Choice(alternatives) => alternatives
            .iter()
            .filter(|alt| matches!(alt, TypeRef::Primitive(_)))
            .map(|alt| (field.wire_key(Some(alt)), Cow::Owned(alternative_kind(alt))))
            .collect(),
        _ => Vec::new(),
    };

    candidates.into_iter().find_map(|(wire_key, kind)| {
        let metadata = record.extra(&format!("_{}", wire_key))?;
        Some(Slot {
            field,
            wire_key,
            kind,
            values: Vec::new(),
            metadata: Some(metadata),
        })
    })
}

pub(crate) fn occurrence_path(path: &str, field: &FieldSpec, index: usize) -> String {
    child_path(path, &field.name, field.is_repeating().then_some(index))
}

/// Spec for the record held in a slot
pub(crate) fn nested_spec(
    registry: &SchemaRegistry,
    kind: &FieldKind,
    record: &TypedRecord,
) -> Result<Arc<RecordTypeSpec>> {
    let name = match kind {
        FieldKind::Record(name) => name.as_str(),
        FieldKind::Reference(_) => "Reference",
        _ => record.type_name(),
    };
    Ok(registry.lookup(name)?)
}

/// Metadata entry of occurrence `index`; repeating fields align metadata
/// arrays with their values, using `null` for occurrences without any.
pub(crate) fn metadata_at(
    metadata: Option<&JsonValue>,
    repeating: bool,
    index: usize,
) -> Option<&JsonValue> {
    let metadata = metadata?;
    let entry = if repeating {
        metadata.as_array()?.get(index)?
    } else if index == 0 {
        metadata
    } else {
        return None;
    };
    (!entry.is_null()).then_some(entry)
}
