//! FHIR JSON codec
//!
//! Resources are JSON objects discriminated by `resourceType`. Repeating
//! fields are arrays, choice fields carry their type as a key suffix
//! (`performedPeriod`), and primitive metadata travels in `_field` keys.

use crate::codec::{
    child_path, layout, nested_spec, occurrence_path, CodecOptions, Entry, WireCodec,
};
use crate::error::{FormatError, Result};
use crate::primitive;
use ferrum_models::{alternative_kind, ChoiceValue, TypedRecord, Value};
use ferrum_schema::{FieldKind, FieldSpec, RecordTypeSpec, SchemaRegistry, TypeRef};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value as JsonValue};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

const RESOURCE_TYPE: &str = "resourceType";

/// JSON codec over a schema registry
#[derive(Debug, Clone)]
pub struct JsonCodec<'r> {
    registry: &'r SchemaRegistry,
    options: CodecOptions,
}

impl<'r> JsonCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self::with_options(registry, CodecOptions::default())
    }

    pub fn with_options(registry: &'r SchemaRegistry, options: CodecOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Decode a resource, looking its type up by `resourceType`
    pub fn decode_value(&self, value: &JsonValue) -> Result<TypedRecord> {
        let object = value
            .as_object()
            .ok_or_else(|| FormatError::ExpectedObject("$".to_string()))?;
        let spec = self.resource_spec(object, "$")?;
        self.decode_object(object, &spec, spec.name())
    }

    /// Decode an object as an instance of `spec`. A `resourceType` that names
    /// another type is rejected.
    pub fn decode_value_as(&self, value: &JsonValue, spec: &RecordTypeSpec) -> Result<TypedRecord> {
        let object = value
            .as_object()
            .ok_or_else(|| FormatError::ExpectedObject(spec.name().to_string()))?;
        if spec.is_resource() {
            if let Some(found) = object.get(RESOURCE_TYPE) {
                if found.as_str() != Some(spec.name()) {
                    return Err(FormatError::mismatch(
                        child_path(spec.name(), RESOURCE_TYPE, None),
                        spec.name(),
                        found.to_string(),
                    ));
                }
            }
        }
        self.decode_object(object, spec, spec.name())
    }

    /// Encode a record using the spec registered for its type
    pub fn encode_value(&self, record: &TypedRecord) -> Result<JsonValue> {
        let spec = self.registry.lookup(record.type_name())?;
        self.encode_value_as(record, &spec)
    }

    pub fn encode_value_as(&self, record: &TypedRecord, spec: &RecordTypeSpec) -> Result<JsonValue> {
        Ok(JsonValue::Object(self.encode_record(record, spec, spec.name())?))
    }

    fn resource_spec(
        &self,
        object: &Map<String, JsonValue>,
        path: &str,
    ) -> Result<Arc<RecordTypeSpec>> {
        let name = object
            .get(RESOURCE_TYPE)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| FormatError::MissingResourceType(path.to_string()))?;
        let spec = self.registry.lookup(name)?;
        if !spec.is_resource() {
            return Err(FormatError::mismatch(
                child_path(path, RESOURCE_TYPE, None),
                "a resource type",
                name,
            ));
        }
        Ok(spec)
    }

    fn decode_object(
        &self,
        object: &Map<String, JsonValue>,
        spec: &RecordTypeSpec,
        path: &str,
    ) -> Result<TypedRecord> {
        let mut record = TypedRecord::new(spec.name());
        let mut chosen: HashMap<&str, &str> = HashMap::new();

        for (key, value) in object {
            if key == RESOURCE_TYPE && spec.is_resource() {
                continue;
            }

            let Some((field, alternative)) = spec.resolve_wire_key(key) else {
                if !key.starts_with('_') {
                    tracing::trace!(record = spec.name(), key = %key, "preserving unknown element");
                }
                record.set_extra(key.clone(), value.clone());
                continue;
            };

            if alternative.is_some() {
                if let Some(previous) = chosen.insert(field.name.as_str(), key.as_str()) {
                    return Err(FormatError::ConflictingChoice {
                        path: child_path(path, &field.name, None),
                        alternatives: vec![previous.to_string(), key.clone()],
                    });
                }
            }

            let values = self.decode_field(field, alternative, value, path)?;
            record.set_all(field.name.clone(), values);
        }

        Ok(record)
    }

    fn decode_field(
        &self,
        field: &FieldSpec,
        alternative: Option<&TypeRef>,
        value: &JsonValue,
        path: &str,
    ) -> Result<Vec<Value>> {
        let kind = match alternative {
            Some(alternative) => Cow::Owned(alternative_kind(alternative)),
            None => Cow::Borrowed(&field.kind),
        };
        let wrap = |value: Value| match alternative {
            Some(alternative) => Value::Choice(ChoiceValue::new(alternative.code(), value)),
            None => value,
        };

        if field.is_repeating() {
            let items = value.as_array().ok_or_else(|| {
                FormatError::mismatch(
                    child_path(path, &field.name, None),
                    format!("an array of {}", kind),
                    json_shape(value),
                )
            })?;
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    self.decode_one(&kind, item, &child_path(path, &field.name, Some(index)))
                        .map(wrap)
                })
                .collect()
        } else {
            let field_path = child_path(path, &field.name, None);
            if value.is_array() {
                return Err(FormatError::mismatch(field_path, kind.to_string(), "an array"));
            }
            Ok(vec![wrap(self.decode_one(&kind, value, &field_path)?)])
        }
    }

    fn decode_one(&self, kind: &FieldKind, value: &JsonValue, path: &str) -> Result<Value> {
        match kind {
            FieldKind::Primitive(primitive) => primitive::from_json(*primitive, value, path),
            FieldKind::Record(_) | FieldKind::Reference(_) => {
                let name = match kind {
                    FieldKind::Record(name) => name.as_str(),
                    _ => "Reference",
                };
                let spec = self.registry.lookup(name)?;
                let object = value
                    .as_object()
                    .ok_or_else(|| FormatError::ExpectedObject(path.to_string()))?;
                Ok(Value::Record(self.decode_object(object, &spec, path)?))
            }
            FieldKind::Resource => {
                let object = value
                    .as_object()
                    .ok_or_else(|| FormatError::ExpectedObject(path.to_string()))?;
                let spec = self.resource_spec(object, path)?;
                Ok(Value::Record(self.decode_object(object, &spec, path)?))
            }
            FieldKind::Choice(_) => Err(FormatError::mismatch(path, kind.to_string(), json_shape(value))),
        }
    }

    fn encode_record(
        &self,
        record: &TypedRecord,
        spec: &RecordTypeSpec,
        path: &str,
    ) -> Result<Map<String, JsonValue>> {
        if record.type_name() != spec.name() {
            return Err(FormatError::SpecMismatch {
                record: record.type_name().to_string(),
                spec: spec.name().to_string(),
            });
        }

        let mut object = Map::new();
        if spec.is_resource() {
            object.insert(RESOURCE_TYPE.to_string(), JsonValue::String(spec.name().to_string()));
        }

        for entry in layout(record, spec, path)? {
            match entry {
                Entry::Extra(key, value) => {
                    object.insert(key.to_string(), value.clone());
                }
                Entry::Field(slot) => {
                    if !slot.values.is_empty() {
                        let encoded = if slot.field.is_repeating() {
                            let items = slot
                                .values
                                .iter()
                                .enumerate()
                                .map(|(index, value)| {
                                    self.encode_one(
                                        &slot.kind,
                                        value,
                                        &occurrence_path(path, slot.field, index),
                                    )
                                })
                                .collect::<Result<Vec<_>>>()?;
                            JsonValue::Array(items)
                        } else {
                            self.encode_one(
                                &slot.kind,
                                slot.values[0],
                                &child_path(path, &slot.field.name, None),
                            )?
                        };
                        object.insert(slot.wire_key.clone(), encoded);
                    }
                    if let Some(metadata) = slot.metadata {
                        object.insert(format!("_{}", slot.wire_key), metadata.clone());
                    }
                }
            }
        }

        Ok(object)
    }

    fn encode_one(&self, kind: &FieldKind, value: &Value, path: &str) -> Result<JsonValue> {
        match kind {
            FieldKind::Primitive(_) => primitive::to_json(value, path),
            _ => {
                let record = value
                    .as_record()
                    .ok_or_else(|| FormatError::mismatch(path, kind.to_string(), value.describe()))?;
                let spec = nested_spec(self.registry, kind, record)?;
                if matches!(kind, FieldKind::Resource) && !spec.is_resource() {
                    return Err(FormatError::mismatch(path, "a resource", record.type_name()));
                }
                Ok(JsonValue::Object(self.encode_record(record, &spec, path)?))
            }
        }
    }

    fn to_string(&self, value: &JsonValue) -> Result<String> {
        if !self.options.pretty {
            return Ok(serde_json::to_string(value)?);
        }
        let indent = vec![b' '; self.options.indent];
        let mut serializer =
            serde_json::Serializer::with_formatter(Vec::new(), PrettyFormatter::with_indent(&indent));
        value.serialize(&mut serializer)?;
        Ok(String::from_utf8(serializer.into_inner())?)
    }
}

impl WireCodec for JsonCodec<'_> {
    fn format(&self) -> &'static str {
        "JSON"
    }

    fn decode_str(&self, input: &str) -> Result<TypedRecord> {
        let value: JsonValue = serde_json::from_str(input).map_err(FormatError::malformed_json)?;
        self.decode_value(&value)
    }

    fn decode_str_as(&self, input: &str, spec: &RecordTypeSpec) -> Result<TypedRecord> {
        let value: JsonValue = serde_json::from_str(input).map_err(FormatError::malformed_json)?;
        self.decode_value_as(&value, spec)
    }

    fn encode_string(&self, record: &TypedRecord) -> Result<String> {
        let value = self.encode_value(record)?;
        self.to_string(&value)
    }
}

/// Short description of a JSON value's shape for error messages
fn json_shape(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Array(_) => "an array".to_string(),
        JsonValue::Object(_) => "an object".to_string(),
        scalar => scalar.to_string(),
    }
}
