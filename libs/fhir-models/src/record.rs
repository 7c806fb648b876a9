//! Generic typed records
//!
//! A [`TypedRecord`] is an instance of a registered record type: a map from
//! field name to the field's occurrences plus the unknown wire keys that were
//! present in the document it was decoded from. Field order on the wire is
//! owned by the record type spec, not by the record.

use crate::builder::RecordBuilder;
use crate::value::{ChoiceValue, Value};
use ferrum_schema::RecordTypeSpec;
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypedRecord {
    type_name: String,
    fields: BTreeMap<String, Vec<Value>>,
    extras: Map<String, JsonValue>,
}

impl TypedRecord {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
            extras: Map::new(),
        }
    }

    /// Start a record whose assignments are checked against `spec`
    pub fn builder(spec: &RecordTypeSpec) -> RecordBuilder<'_> {
        RecordBuilder::new(spec)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// True when neither fields nor unknown keys are present
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.extras.is_empty()
    }

    /// Names of populated fields, sorted
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// All occurrences of a field; empty when the field is absent
    pub fn get(&self, field: &str) -> &[Value] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Vec<Value>> {
        self.fields.get_mut(field)
    }

    pub fn first(&self, field: &str) -> Option<&Value> {
        self.get(field).first()
    }

    pub fn count(&self, field: &str) -> usize {
        self.get(field).len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.count(field) > 0
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.first(field).and_then(Value::as_str)
    }

    pub fn bool(&self, field: &str) -> Option<bool> {
        self.first(field).and_then(Value::as_bool)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.first(field).and_then(Value::as_integer)
    }

    pub fn decimal(&self, field: &str) -> Option<Decimal> {
        self.first(field).and_then(Value::as_decimal)
    }

    pub fn record(&self, field: &str) -> Option<&TypedRecord> {
        self.first(field).and_then(Value::as_record)
    }

    /// Nested records of a repeating field, in order
    pub fn records<'a>(&'a self, field: &str) -> impl Iterator<Item = &'a TypedRecord> + 'a {
        self.get(field).iter().filter_map(Value::as_record)
    }

    pub fn choice(&self, field: &str) -> Option<&ChoiceValue> {
        self.first(field).and_then(Value::as_choice)
    }

    /// Value of a choice field if the populated alternative is `type_code`
    pub fn choice_as(&self, field: &str, type_code: &str) -> Option<&Value> {
        self.choice(field)
            .filter(|choice| choice.type_code == type_code)
            .map(|choice| choice.value.as_ref())
    }

    /// Replace all occurrences of a field with a single value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), vec![value.into()]);
        self
    }

    /// Replace all occurrences of a field; an empty list removes the field
    pub fn set_all(&mut self, field: impl Into<String>, values: Vec<Value>) -> &mut Self {
        let field = field.into();
        if values.is_empty() {
            self.fields.remove(&field);
        } else {
            self.fields.insert(field, values);
        }
        self
    }

    /// Append an occurrence to a field
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields
            .entry(field.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Populate one alternative of a choice field, dropping whichever
    /// alternative was populated before.
    pub fn set_choice(
        &mut self,
        field: impl Into<String>,
        type_code: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.set(field, ChoiceValue::new(type_code, value))
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<Value>> {
        self.fields.remove(field)
    }

    /// Unknown wire keys in the order they were encountered
    pub fn extras(&self) -> &Map<String, JsonValue> {
        &self.extras
    }

    pub fn extra(&self, key: &str) -> Option<&JsonValue> {
        self.extras.get(key)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: JsonValue) -> &mut Self {
        self.extras.insert(key.into(), value);
        self
    }

    pub fn remove_extra(&mut self, key: &str) -> Option<JsonValue> {
        self.extras.shift_remove(key)
    }
}

impl Hash for TypedRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_name.hash(state);
        self.fields.hash(state);

        // Map equality ignores key order, so hash extras in sorted key order
        let mut keys: Vec<&String> = self.extras.keys().collect();
        keys.sort_unstable();
        state.write_usize(keys.len());
        for key in keys {
            key.hash(state);
            if let Some(value) = self.extras.get(key) {
                hash_json(value, state);
            }
        }
    }
}

fn hash_json<H: Hasher>(value: &JsonValue, state: &mut H) {
    match value {
        JsonValue::Null => state.write_u8(0),
        JsonValue::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        JsonValue::Number(n) => {
            state.write_u8(2);
            n.to_string().hash(state);
        }
        JsonValue::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        JsonValue::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                hash_json(item, state);
            }
        }
        JsonValue::Object(map) => {
            state.write_u8(5);
            let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            state.write_usize(entries.len());
            for (key, item) in entries {
                key.hash(state);
                hash_json(item, state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(record: &TypedRecord) -> u64 {
        let mut hasher = DefaultHasher::new();
        record.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn accessors_on_absent_fields() {
        let record = TypedRecord::new("Device");
        assert!(record.is_empty());
        assert!(record.get("status").is_empty());
        assert_eq!(record.count("status"), 0);
        assert!(record.str("status").is_none());
        assert!(record.record("owner").is_none());
    }

    #[test]
    fn set_push_and_remove() {
        let mut record = TypedRecord::new("Procedure");
        record.set("status", "completed");
        record.push("bodySite", TypedRecord::new("CodeableConcept"));
        record.push("bodySite", TypedRecord::new("CodeableConcept"));

        assert_eq!(record.str("status"), Some("completed"));
        assert_eq!(record.records("bodySite").count(), 2);
        assert_eq!(record.field_names().collect::<Vec<_>>(), ["bodySite", "status"]);

        record.set("status", "stopped");
        assert_eq!(record.count("status"), 1);
        assert_eq!(record.str("status"), Some("stopped"));

        assert_eq!(record.remove("bodySite").map(|v| v.len()), Some(2));
        record.set_all("status", Vec::new());
        assert!(record.is_empty());
    }

    #[test]
    fn set_choice_replaces_previous_alternative() {
        let mut record = TypedRecord::new("Procedure");
        record.set_choice("performed", "dateTime", "2020-01-01");
        record.set_choice("performed", "string", "last spring");

        assert_eq!(record.count("performed"), 1);
        assert!(record.choice_as("performed", "dateTime").is_none());
        assert_eq!(
            record.choice_as("performed", "string").and_then(Value::as_str),
            Some("last spring")
        );
    }

    #[test]
    fn equal_records_hash_equally() {
        let mut a = TypedRecord::new("Device");
        a.set("status", "active");
        a.set_extra("customVendorField", json!({"x": 1, "y": [true, null]}));
        a.set_extra("other", json!("z"));

        let mut b = TypedRecord::new("Device");
        b.set_extra("other", json!("z"));
        b.set_extra("customVendorField", json!({"y": [true, null], "x": 1}));
        b.set("status", "active");

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        b.set("status", "inactive");
        assert_ne!(a, b);
    }
}
