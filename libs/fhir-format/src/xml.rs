//! FHIR XML codec
//!
//! Follows the FHIR XML representation:
//! - The root element is named after the resource type, in the FHIR namespace.
//! - Primitive values are carried in the `value` attribute; the element's
//!   `id` attribute and `extension` children are its metadata.
//! - Datatype and backbone ids are attributes, inline resources are wrapped
//!   in an element named after the field.
//! - Repeating fields are repeated elements.
//!
//! Content the schema does not declare is converted with the generic
//! JSON/XML mapping so that it can be carried as JSON extras.

use crate::codec::{
    child_path, layout, metadata_at, nested_spec, occurrence_path, CodecOptions, Entry,
    WireCodec, EXTENSION_KEYS,
};
use crate::error::{FormatError, Result};
use crate::json::JsonCodec;
use crate::primitive;
use ferrum_models::{alternative_kind, ChoiceValue, TypedRecord, Value};
use ferrum_schema::{FieldKind, PrimitiveType, RecordTypeSpec, SchemaRegistry, TypeCategory};
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;
use roxmltree::{Document, Node};
use serde_json::{Map, Value as JsonValue};
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

pub const FHIR_NS: &str = "http://hl7.org/fhir";
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// XML codec over a schema registry
#[derive(Debug, Clone)]
pub struct XmlCodec<'r> {
    registry: &'r SchemaRegistry,
    options: CodecOptions,
}

/// `_field` metadata gathered while decoding the primitive children of one
/// element
struct PendingMetadata {
    wire_key: String,
    field: String,
    repeating: bool,
    entries: Vec<JsonValue>,
}

impl<'r> XmlCodec<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self::with_options(registry, CodecOptions::default())
    }

    pub fn with_options(registry: &'r SchemaRegistry, options: CodecOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Decode a parsed document; the root element names the resource type
    pub fn decode_document(&self, document: &Document) -> Result<TypedRecord> {
        let root = document.root_element();
        check_namespace(root)?;
        let spec = self.resource_spec(root, root.tag_name().name())?;
        self.decode_node(root, document.input_text(), &spec, spec.name())
    }

    /// Decode one element as an instance of `spec`; `source` is the text the
    /// element was parsed from.
    pub fn decode_element(
        &self,
        node: Node,
        source: &str,
        spec: &RecordTypeSpec,
    ) -> Result<TypedRecord> {
        self.decode_node(node, source, spec, spec.name())
    }

    /// Encode a record as a standalone document
    pub fn encode_string_as(&self, record: &TypedRecord, spec: &RecordTypeSpec) -> Result<String> {
        let mut writer = if self.options.pretty {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', self.options.indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };
        self.write_record(&mut writer, spec.name(), record, spec, spec.name(), true)?;
        let bytes = writer.into_inner().into_inner();
        Ok(String::from_utf8(bytes)?)
    }

    fn resource_spec(&self, node: Node, path: &str) -> Result<Arc<RecordTypeSpec>> {
        let name = node.tag_name().name();
        let spec = self.registry.lookup(name)?;
        if !spec.is_resource() {
            return Err(FormatError::mismatch(path, "a resource type", name));
        }
        Ok(spec)
    }

    fn decode_node(
        &self,
        node: Node,
        source: &str,
        spec: &RecordTypeSpec,
        path: &str,
    ) -> Result<TypedRecord> {
        let mut record = TypedRecord::new(spec.name());

        for field in spec.fields().iter().filter(|field| field.xml_attribute) {
            if let (Some(text), FieldKind::Primitive(primitive)) =
                (node.attribute(field.name.as_str()), &field.kind)
            {
                let value =
                    primitive::from_text(*primitive, text, &child_path(path, &field.name, None))?;
                record.set(field.name.clone(), value);
            }
        }

        let mut chosen: HashMap<&str, &str> = HashMap::new();
        let mut pending: Vec<PendingMetadata> = Vec::new();
        let mut unknown = Map::new();

        for child in node.children().filter(Node::is_element) {
            let name = child.tag_name().name();
            let resolved = spec
                .resolve_wire_key(name)
                .filter(|(field, _)| !field.xml_attribute);
            let Some((field, alternative)) = resolved else {
                tracing::trace!(record = spec.name(), element = name, "preserving unknown element");
                let (value, metadata) = self.generic_value(child, source);
                insert_property(&mut unknown, name, value, metadata);
                continue;
            };

            if alternative.is_some() {
                if let Some(previous) = chosen.insert(field.name.as_str(), name) {
                    if previous != name {
                        return Err(FormatError::ConflictingChoice {
                            path: child_path(path, &field.name, None),
                            alternatives: vec![previous.to_string(), name.to_string()],
                        });
                    }
                }
            }

            let repeating = field.is_repeating();
            let index = record.count(&field.name);
            if !repeating && (index > 0 || pending.iter().any(|p| p.wire_key == name)) {
                return Err(FormatError::mismatch(
                    child_path(path, &field.name, None),
                    "a single value",
                    format!("repeated <{}> element", name),
                ));
            }
            let child_location = child_path(path, &field.name, repeating.then_some(index));

            let kind = match alternative {
                Some(alternative) => Cow::Owned(alternative_kind(alternative)),
                None => Cow::Borrowed(&field.kind),
            };

            let value = match kind.as_ref() {
                FieldKind::Primitive(primitive) => {
                    let (value, metadata) =
                        self.decode_primitive(child, source, *primitive, &child_location)?;
                    if let Some(metadata) = metadata {
                        let slot = match pending.iter().position(|p| p.wire_key == name) {
                            Some(position) => &mut pending[position],
                            None => {
                                pending.push(PendingMetadata {
                                    wire_key: name.to_string(),
                                    field: field.name.clone(),
                                    repeating,
                                    entries: Vec::new(),
                                });
                                let last = pending.len() - 1;
                                &mut pending[last]
                            }
                        };
                        slot.entries.resize(index, JsonValue::Null);
                        slot.entries.push(metadata);
                    }
                    match value {
                        Some(value) => value,
                        None if !repeating && pending.iter().any(|p| p.wire_key == name) => {
                            continue
                        }
                        None => {
                            return Err(FormatError::mismatch(
                                child_location,
                                primitive.name(),
                                "an element without a value",
                            ))
                        }
                    }
                }
                FieldKind::Record(_) | FieldKind::Reference(_) => {
                    let name = match kind.as_ref() {
                        FieldKind::Record(name) => name.as_str(),
                        _ => "Reference",
                    };
                    let nested = self.registry.lookup(name)?;
                    Value::Record(self.decode_node(child, source, &nested, &child_location)?)
                }
                FieldKind::Resource => {
                    let inner = child
                        .children()
                        .find(Node::is_element)
                        .ok_or_else(|| FormatError::MissingResourceType(child_location.clone()))?;
                    let nested = self.resource_spec(inner, &child_location)?;
                    Value::Record(self.decode_node(inner, source, &nested, &child_location)?)
                }
                FieldKind::Choice(_) => {
                    return Err(FormatError::mismatch(
                        child_location,
                        kind.to_string(),
                        format!("<{}> element", name),
                    ))
                }
            };

            let value = match alternative {
                Some(alternative) => Value::Choice(ChoiceValue::new(alternative.code(), value)),
                None => value,
            };
            record.push(field.name.clone(), value);
        }

        for metadata in pending {
            let value = if metadata.repeating {
                let mut entries = metadata.entries;
                entries.resize(record.count(&metadata.field).max(entries.len()), JsonValue::Null);
                JsonValue::Array(entries)
            } else {
                match metadata.entries.into_iter().next() {
                    Some(entry) => entry,
                    None => continue,
                }
            };
            record.set_extra(format!("_{}", metadata.wire_key), value);
        }
        for (key, value) in unknown {
            record.set_extra(key, value);
        }

        Ok(record)
    }

    fn decode_primitive(
        &self,
        node: Node,
        source: &str,
        primitive: PrimitiveType,
        path: &str,
    ) -> Result<(Option<Value>, Option<JsonValue>)> {
        if primitive == PrimitiveType::Xhtml {
            return Ok((Some(Value::String(source[node.range()].to_string())), None));
        }
        let value = node
            .attribute("value")
            .map(|text| primitive::from_text(primitive, text, path))
            .transpose()?;
        Ok((value, self.primitive_metadata(node, source)))
    }

    /// `id` attribute and `extension` children of a primitive element
    fn primitive_metadata(&self, node: Node, source: &str) -> Option<JsonValue> {
        let mut metadata = Map::new();
        if let Some(id) = node.attribute("id") {
            metadata.insert("id".to_string(), JsonValue::String(id.to_string()));
        }
        let extensions: Vec<JsonValue> = node
            .children()
            .filter(|child| child.is_element() && child.tag_name().name() == "extension")
            .map(|child| self.generic_value(child, source).0)
            .collect();
        if !extensions.is_empty() {
            metadata.insert("extension".to_string(), JsonValue::Array(extensions));
        }
        (!metadata.is_empty()).then_some(JsonValue::Object(metadata))
    }

    /// Schema-agnostic conversion of an element the schema does not declare.
    /// Returns the JSON value and, for primitives, its `_field` metadata.
    fn generic_value(&self, node: Node, source: &str) -> (JsonValue, Option<JsonValue>) {
        let name = node.tag_name().name();
        if node.tag_name().namespace() == Some(XHTML_NS) {
            return (JsonValue::String(source[node.range()].to_string()), None);
        }

        if let Some(text) = node.attribute("value") {
            let value = match type_suffixes(name).find_map(primitive::from_suffix) {
                Some(primitive) => primitive::text_to_json(Some(primitive), text),
                None => guess_primitive(text),
            };
            return (value, self.primitive_metadata(node, source));
        }

        if let Some(value) = self.typed_value(node, source) {
            return (value, None);
        }

        let mut object = Map::new();
        for attribute in ["id", "url"] {
            if let Some(value) = node.attribute(attribute) {
                object.insert(attribute.to_string(), JsonValue::String(value.to_string()));
            }
        }
        for child in node.children().filter(Node::is_element) {
            let (value, metadata) = self.generic_value(child, source);
            insert_property(&mut object, child.tag_name().name(), value, metadata);
        }
        (JsonValue::Object(object), None)
    }

    /// Decode `valueQuantity`-style elements through the datatype their
    /// name ends with, so numbers and booleans keep their JSON types.
    fn typed_value(&self, node: Node, source: &str) -> Option<JsonValue> {
        let name = node.tag_name().name();
        let spec = type_suffixes(name).find_map(|suffix| {
            self.registry
                .get(suffix)
                .filter(|spec| spec.category() == TypeCategory::Datatype)
        })?;
        let record = self.decode_node(node, source, spec, name).ok()?;
        JsonCodec::new(self.registry)
            .encode_value_as(&record, spec)
            .ok()
    }

    fn write_record(
        &self,
        writer: &mut XmlWriter,
        tag: &str,
        record: &TypedRecord,
        spec: &RecordTypeSpec,
        path: &str,
        root: bool,
    ) -> Result<()> {
        if record.type_name() != spec.name() {
            return Err(FormatError::SpecMismatch {
                record: record.type_name().to_string(),
                spec: spec.name().to_string(),
            });
        }

        let mut start = BytesStart::new(tag);
        if root {
            start.push_attribute(("xmlns", FHIR_NS));
        }

        let entries = layout(record, spec, path)?;
        let mut children = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Entry::Field(slot) if slot.field.xml_attribute => {
                    if let Some(value) = slot.values.first() {
                        let text = primitive::to_text(value, &child_path(path, &slot.field.name, None))?;
                        push_attribute(&mut start, &slot.wire_key, &text);
                    }
                }
                entry => children.push(entry),
            }
        }

        if children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for entry in children {
            match entry {
                Entry::Field(slot) => {
                    let repeating = slot.field.is_repeating();
                    for (index, value) in slot.values.iter().enumerate() {
                        let location = occurrence_path(path, slot.field, index);
                        let metadata = metadata_at(slot.metadata, repeating, index);
                        self.write_value(writer, &slot.wire_key, &slot.kind, value, metadata, &location)?;
                    }
                    if slot.values.is_empty() {
                        match slot.metadata {
                            Some(JsonValue::Array(entries)) => {
                                for entry in entries.iter().filter(|entry| !entry.is_null()) {
                                    write_primitive(writer, &slot.wire_key, None, Some(entry))?;
                                }
                            }
                            metadata => write_primitive(writer, &slot.wire_key, None, metadata)?,
                        }
                    }
                }
                Entry::Extra(key, value) => {
                    if let Some(base) = key.strip_prefix('_') {
                        if record.extra(base).is_none() {
                            write_json_value(writer, base, &JsonValue::Null, Some(value))?;
                        }
                        continue;
                    }
                    let metadata = record.extra(&format!("_{}", key));
                    write_json_value(writer, key, value, metadata)?;
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn write_value(
        &self,
        writer: &mut XmlWriter,
        name: &str,
        kind: &FieldKind,
        value: &Value,
        metadata: Option<&JsonValue>,
        path: &str,
    ) -> Result<()> {
        match kind {
            FieldKind::Primitive(PrimitiveType::Xhtml) => {
                let snippet = primitive::to_text(value, path)?;
                primitive::check_xhtml(&snippet, path)?;
                writer.write_event(Event::Text(BytesText::from_escaped(snippet.as_str())))?;
                Ok(())
            }
            FieldKind::Primitive(_) => {
                let text = primitive::to_text(value, path)?;
                write_primitive(writer, name, Some(&text), metadata)
            }
            _ => {
                let record = value
                    .as_record()
                    .ok_or_else(|| FormatError::mismatch(path, kind.to_string(), value.describe()))?;
                let spec = nested_spec(self.registry, kind, record)?;
                if matches!(kind, FieldKind::Resource) {
                    if !spec.is_resource() {
                        return Err(FormatError::mismatch(path, "a resource", record.type_name()));
                    }
                    writer.write_event(Event::Start(BytesStart::new(name)))?;
                    self.write_record(writer, spec.name(), record, &spec, path, false)?;
                    writer.write_event(Event::End(BytesEnd::new(name)))?;
                    Ok(())
                } else {
                    self.write_record(writer, name, record, &spec, path, false)
                }
            }
        }
    }
}

impl WireCodec for XmlCodec<'_> {
    fn format(&self) -> &'static str {
        "XML"
    }

    fn decode_str(&self, input: &str) -> Result<TypedRecord> {
        let document = Document::parse(input).map_err(FormatError::malformed_xml)?;
        self.decode_document(&document)
    }

    fn decode_str_as(&self, input: &str, spec: &RecordTypeSpec) -> Result<TypedRecord> {
        let document = Document::parse(input).map_err(FormatError::malformed_xml)?;
        let root = document.root_element();
        check_namespace(root)?;
        let name = root.tag_name().name();
        if spec.is_resource() && name != spec.name() {
            return Err(FormatError::mismatch(spec.name(), spec.name(), name));
        }
        self.decode_node(root, input, spec, spec.name())
    }

    fn encode_string(&self, record: &TypedRecord) -> Result<String> {
        let spec = self.registry.lookup(record.type_name())?;
        self.encode_string_as(record, &spec)
    }
}

fn check_namespace(root: Node) -> Result<()> {
    match root.tag_name().namespace() {
        None | Some(FHIR_NS) => Ok(()),
        Some(other) => Err(FormatError::mismatch(
            root.tag_name().name(),
            format!("an element in {}", FHIR_NS),
            other,
        )),
    }
}

/// Possible type suffixes of an element name, longest first
/// (`valueDateTime` -> `DateTime`, `Time`)
fn type_suffixes(name: &str) -> impl Iterator<Item = &str> {
    name.char_indices()
        .filter(|(index, c)| *index > 0 && c.is_ascii_uppercase())
        .map(move |(index, _)| &name[index..])
}

/// Primitive text without a known type: booleans and canonical integers
/// keep their JSON types, anything else is a string
fn guess_primitive(text: &str) -> JsonValue {
    match text {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => match text.parse::<i64>() {
            Ok(int) if int.to_string() == text => JsonValue::Number(int.into()),
            _ => JsonValue::String(text.to_string()),
        },
    }
}

/// Add a converted element to a JSON object: repeated elements collapse into
/// arrays, extensions are always arrays and primitive metadata is aligned
/// with the values it belongs to.
fn insert_property(
    object: &mut Map<String, JsonValue>,
    name: &str,
    value: JsonValue,
    metadata: Option<JsonValue>,
) {
    let count = match object.entry(name) {
        serde_json::map::Entry::Vacant(vacant) => {
            if EXTENSION_KEYS.contains(&name) {
                vacant.insert(JsonValue::Array(vec![value]));
            } else {
                vacant.insert(value);
            }
            1
        }
        serde_json::map::Entry::Occupied(mut occupied) => match occupied.get_mut() {
            JsonValue::Array(items) => {
                items.push(value);
                items.len()
            }
            existing => {
                let first = existing.take();
                *existing = JsonValue::Array(vec![first, value]);
                2
            }
        },
    };

    let metadata_key = format!("_{}", name);
    if metadata.is_none() && !object.contains_key(&metadata_key) {
        return;
    }
    if !matches!(object.get(name), Some(JsonValue::Array(_))) {
        if let Some(metadata) = metadata {
            object.insert(metadata_key, metadata);
        }
        return;
    }

    let slot = object
        .entry(metadata_key)
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    if !slot.is_array() {
        let first = slot.take();
        *slot = JsonValue::Array(vec![first]);
    }
    if let JsonValue::Array(entries) = slot {
        entries.resize(count - 1, JsonValue::Null);
        entries.push(metadata.unwrap_or(JsonValue::Null));
    }
}

fn write_json_value(
    writer: &mut XmlWriter,
    name: &str,
    value: &JsonValue,
    metadata: Option<&JsonValue>,
) -> Result<()> {
    match value {
        JsonValue::Array(items) => {
            let aligned = metadata.and_then(JsonValue::as_array);
            for (index, item) in items.iter().enumerate() {
                let item_metadata = aligned.and_then(|entries| entries.get(index));
                write_json_value(writer, name, item, item_metadata)?;
            }
        }
        JsonValue::Object(object) => write_complex(writer, name, object)?,
        JsonValue::Null => write_primitive(writer, name, None, metadata)?,
        JsonValue::String(text) if name == "div" && primitive::check_xhtml(text, name).is_ok() => {
            writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?;
        }
        primitive => write_primitive(writer, name, Some(&primitive_to_string(primitive)), metadata)?,
    }
    Ok(())
}

/// Attribute values keep line breaks and tabs as character references
fn push_attribute(start: &mut BytesStart, key: &str, value: &str) {
    let escaped = escape(value)
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
        .replace('\t', "&#9;");
    start.push_attribute(Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    });
}

fn write_complex(writer: &mut XmlWriter, name: &str, object: &Map<String, JsonValue>) -> Result<()> {
    let attributes: &[&str] = if EXTENSION_KEYS.contains(&name) {
        &["id", "url"]
    } else {
        &["id"]
    };

    let mut start = BytesStart::new(name);
    for attribute in attributes {
        if let Some(JsonValue::String(value)) = object.get(*attribute) {
            push_attribute(&mut start, attribute, value);
        }
    }

    let children: Vec<(&String, &JsonValue)> = object
        .iter()
        .filter(|(key, value)| {
            !(attributes.contains(&key.as_str()) && value.is_string())
                && !key
                    .strip_prefix('_')
                    .is_some_and(|base| object.contains_key(base))
        })
        .collect();

    if children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for (key, value) in children {
        match key.strip_prefix('_') {
            Some(base) => write_json_value(writer, base, &JsonValue::Null, Some(value))?,
            None => {
                let metadata = object.get(&format!("_{}", key));
                write_json_value(writer, key, value, metadata)?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_primitive(
    writer: &mut XmlWriter,
    name: &str,
    value: Option<&str>,
    metadata: Option<&JsonValue>,
) -> Result<()> {
    let mut element = BytesStart::new(name);
    if let Some(value) = value {
        push_attribute(&mut element, "value", value);
    }

    let metadata = metadata.and_then(JsonValue::as_object);
    let id = metadata.and_then(|m| m.get("id")).and_then(JsonValue::as_str);
    if let Some(id) = id {
        push_attribute(&mut element, "id", id);
    }
    let extensions = metadata.and_then(|m| m.get("extension"));

    if value.is_none() && id.is_none() && extensions.is_none() {
        return Ok(());
    }

    match extensions {
        Some(extensions) => {
            writer.write_event(Event::Start(element))?;
            write_json_value(writer, "extension", extensions, None)?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        None => writer.write_event(Event::Empty(element))?,
    }
    Ok(())
}

fn primitive_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
