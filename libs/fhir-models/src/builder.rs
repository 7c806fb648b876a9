//! Spec-checked construction of records

use crate::error::{Error, Result};
use crate::record::TypedRecord;
use crate::value::{alternative_kind, ChoiceValue, Value};
use ferrum_schema::{FieldSpec, RecordTypeSpec};
use serde_json::Value as JsonValue;

/// Builds a [`TypedRecord`] while checking every assignment against the
/// record type spec. The first failing assignment is remembered and returned
/// from [`RecordBuilder::build`]; later assignments are ignored.
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    spec: &'a RecordTypeSpec,
    record: TypedRecord,
    error: Option<Error>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(spec: &'a RecordTypeSpec) -> Self {
        Self {
            spec,
            record: TypedRecord::new(spec.name()),
            error: None,
        }
    }

    /// Set a field to a single value
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(spec) = self.checked_field(field, &value) {
            let name = spec.name.clone();
            self.record.set(name, value);
        }
        self
    }

    /// Append a value to a field; only repeating fields take more than one
    pub fn push(mut self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(spec) = self.checked_field(field, &value) {
            let name = spec.name.clone();
            if !spec.is_repeating() && self.record.contains(&name) {
                let path = spec.path.clone();
                self.fail(Error::InvalidFieldValue {
                    path,
                    message: format!("field allows at most {}", spec.cardinality.max),
                });
                return self;
            }
            self.record.push(name, value);
        }
        self
    }

    /// Populate one alternative of a choice field
    pub fn choice(self, field: &str, type_code: &str, value: impl Into<Value>) -> Self {
        self.set(field, ChoiceValue::new(type_code, value))
    }

    /// Attach an unknown wire key that should travel with the record
    pub fn extra(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        if self.error.is_none() {
            self.record.set_extra(key, value);
        }
        self
    }

    pub fn build(self) -> Result<TypedRecord> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.record),
        }
    }

    fn checked_field(&mut self, field: &str, value: &Value) -> Option<&'a FieldSpec> {
        if self.error.is_some() {
            return None;
        }

        let spec = self.spec;
        let Some(field_spec) = spec.field(field) else {
            self.fail(Error::UnknownField {
                type_name: spec.name().to_string(),
                field: field.to_string(),
            });
            return None;
        };

        if !value.conforms_to(&field_spec.kind) {
            let message = match (value, field_spec.kind.alternatives()) {
                (Value::Choice(choice), alternatives) if !alternatives.is_empty() => {
                    match field_spec.alternative(&choice.type_code) {
                        Some(alt) => format!(
                            "expected {} for alternative {}, got {}",
                            alternative_kind(alt),
                            choice.type_code,
                            choice.value.describe()
                        ),
                        None => format!("'{}' is not an allowed type", choice.type_code),
                    }
                }
                _ => format!(
                    "expected {}, got {}",
                    field_spec.kind,
                    value.describe()
                ),
            };
            self.fail(Error::InvalidFieldValue {
                path: field_spec.path.clone(),
                message,
            });
            return None;
        }

        Some(field_spec)
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}
