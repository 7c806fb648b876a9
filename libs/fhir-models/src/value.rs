//! Field values held by a [`TypedRecord`]

use crate::record::TypedRecord;
use ferrum_schema::{FieldKind, PrimitiveKind, TypeRef};
use rust_decimal::Decimal;
use std::fmt;

/// One occurrence of a field.
///
/// Primitives are stored in their natural representation: codes, dates and
/// other string-based primitives as [`Value::String`], all integer flavors as
/// [`Value::Integer`]. Decimals keep the scale they were written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Record(TypedRecord),
    Choice(ChoiceValue),
}

/// Populated alternative of a `value[x]` field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceValue {
    /// Type code of the alternative (`dateTime`, `Period`)
    pub type_code: String,
    pub value: Box<Value>,
}

impl ChoiceValue {
    pub fn new(type_code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            type_code: type_code.into(),
            value: Box::new(value.into()),
        }
    }
}

impl Value {
    pub fn choice(type_code: impl Into<String>, value: impl Into<Value>) -> Self {
        Value::Choice(ChoiceValue::new(type_code, value))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&TypedRecord> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut TypedRecord> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&ChoiceValue> {
        match self {
            Value::Choice(choice) => Some(choice),
            _ => None,
        }
    }

    /// Short description of the value's shape, used in error messages
    pub fn describe(&self) -> String {
        match self {
            Value::Boolean(_) => "boolean".to_string(),
            Value::Integer(_) => "integer".to_string(),
            Value::Decimal(_) => "decimal".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Record(record) => format!("record {}", record.type_name()),
            Value::Choice(choice) => format!("choice {}", choice.type_code),
        }
    }

    /// Whether the value has the shape the declared kind expects.
    ///
    /// Lexical rules of string-based primitives are not checked here; they
    /// belong to the wire codecs. Inline resources only need to be records.
    pub fn conforms_to(&self, kind: &FieldKind) -> bool {
        match (kind, self) {
            (FieldKind::Primitive(primitive), value) => {
                matches!(
                    (primitive.kind(), value),
                    (PrimitiveKind::Boolean, Value::Boolean(_))
                        | (PrimitiveKind::Integer, Value::Integer(_))
                        | (PrimitiveKind::Decimal, Value::Decimal(_))
                        | (PrimitiveKind::String, Value::String(_))
                )
            }
            (FieldKind::Record(name), Value::Record(record)) => record.type_name() == name,
            (FieldKind::Reference(_), Value::Record(record)) => record.type_name() == "Reference",
            (FieldKind::Resource, Value::Record(_)) => true,
            (FieldKind::Choice(alternatives), Value::Choice(choice)) => alternatives
                .iter()
                .find(|alt| alt.code() == choice.type_code)
                .is_some_and(|alt| choice.value.conforms_to(&alternative_kind(alt))),
            _ => false,
        }
    }
}

/// Field kind a single choice alternative decodes as
pub fn alternative_kind(alternative: &TypeRef) -> FieldKind {
    match alternative {
        TypeRef::Primitive(primitive) => FieldKind::Primitive(*primitive),
        TypeRef::Complex(name) => FieldKind::Record(name.clone()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Record(record) => write!(f, "{} {{..}}", record.type_name()),
            Value::Choice(choice) => write!(f, "{}", choice.value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<TypedRecord> for Value {
    fn from(value: TypedRecord) -> Self {
        Value::Record(value)
    }
}

impl From<ChoiceValue> for Value {
    fn from(value: ChoiceValue) -> Self {
        Value::Choice(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrum_schema::PrimitiveType;
    use std::str::FromStr;

    #[test]
    fn primitive_shapes() {
        let code = FieldKind::Primitive(PrimitiveType::Code);
        assert!(Value::from("active").conforms_to(&code));
        assert!(!Value::from(true).conforms_to(&code));

        let count = FieldKind::Primitive(PrimitiveType::PositiveInt);
        assert!(Value::from(3).conforms_to(&count));
        assert!(!Value::from("3").conforms_to(&count));
    }

    #[test]
    fn record_shapes() {
        let period = TypedRecord::new("Period");
        assert!(Value::from(period.clone()).conforms_to(&FieldKind::Record("Period".into())));
        assert!(!Value::from(period.clone()).conforms_to(&FieldKind::Record("Range".into())));
        assert!(Value::from(period).conforms_to(&FieldKind::Resource));

        let reference = TypedRecord::new("Reference");
        assert!(Value::from(reference).conforms_to(&FieldKind::Reference(vec!["Patient".into()])));
    }

    #[test]
    fn choice_shapes() {
        let kind = FieldKind::Choice(vec![
            TypeRef::from_code("dateTime"),
            TypeRef::from_code("Period"),
        ]);
        assert!(Value::choice("dateTime", "2020-01-01").conforms_to(&kind));
        assert!(Value::choice("Period", TypedRecord::new("Period")).conforms_to(&kind));
        assert!(!Value::choice("Period", "2020").conforms_to(&kind));
        assert!(!Value::choice("string", "x").conforms_to(&kind));
        assert!(!Value::from("2020-01-01").conforms_to(&kind));
    }

    #[test]
    fn decimals_keep_their_scale() {
        let value = Value::from(Decimal::from_str("1.50").unwrap());
        assert_eq!(value.to_string(), "1.50");
    }
}
