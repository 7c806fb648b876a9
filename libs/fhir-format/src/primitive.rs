//! Primitive coercion between wire text and [`Value`]s
//!
//! Lexical rules follow the FHIR R4 datatype definitions. Integers are range
//! checked against the 32-bit bounds FHIR defines, decimals keep the scale
//! they were written with.

use crate::error::{FormatError, Result};
use crate::xml::XHTML_NS;
use ferrum_models::Value;
use ferrum_schema::PrimitiveType;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Number, Value as JsonValue};
use std::str::FromStr;

macro_rules! fhir_regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> =
            Lazy::new(|| Regex::new($pattern).expect("FHIR primitive regex must compile"));
    };
}

fhir_regex!(INTEGER, r"^-?([0]|([1-9][0-9]*))$");
fhir_regex!(ID, r"^[A-Za-z0-9\-\.]{1,64}$");
fhir_regex!(CODE, r"^[^\s]+( [^\s]+)*$");
fhir_regex!(OID, r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$");
fhir_regex!(
    UUID,
    r"^urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$"
);
fhir_regex!(URI, r"^\S*$");
fhir_regex!(
    DATE,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?$"
);
fhir_regex!(
    DATE_TIME,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00)))?)?)?$"
);
fhir_regex!(
    INSTANT,
    r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))$"
);
fhir_regex!(TIME, r"^([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?$");
fhir_regex!(BASE64, r"^(\s*([0-9a-zA-Z\+/=]){4}\s*)+$");

fn lexical_rule(primitive: PrimitiveType) -> Option<&'static Regex> {
    let regex = match primitive {
        PrimitiveType::Id => &ID,
        PrimitiveType::Code => &CODE,
        PrimitiveType::Oid => &OID,
        PrimitiveType::Uuid => &UUID,
        PrimitiveType::Uri | PrimitiveType::Url | PrimitiveType::Canonical => &URI,
        PrimitiveType::Date => &DATE,
        PrimitiveType::DateTime => &DATE_TIME,
        PrimitiveType::Instant => &INSTANT,
        PrimitiveType::Time => &TIME,
        PrimitiveType::Base64Binary => &BASE64,
        _ => return None,
    };
    Some(Lazy::force(regex))
}

fn integer_bounds(primitive: PrimitiveType) -> (i64, i64) {
    let max = i64::from(i32::MAX);
    match primitive {
        PrimitiveType::UnsignedInt => (0, max),
        PrimitiveType::PositiveInt => (1, max),
        _ => (i64::from(i32::MIN), max),
    }
}

fn check_integer(primitive: PrimitiveType, value: i64, raw: &str, path: &str) -> Result<Value> {
    let (min, max) = integer_bounds(primitive);
    if value < min || value > max {
        return Err(FormatError::mismatch(path, primitive.name(), raw));
    }
    Ok(Value::Integer(value))
}

/// Narrative content must be a well-formed fragment rooted at an xhtml `div`
pub(crate) fn check_xhtml(text: &str, path: &str) -> Result<()> {
    let mismatch = || FormatError::mismatch(path, PrimitiveType::Xhtml.name(), text);
    let document = roxmltree::Document::parse(text).map_err(|_| mismatch())?;
    let root = document.root_element().tag_name();
    if root.name() != "div" || root.namespace() != Some(XHTML_NS) {
        return Err(mismatch());
    }
    Ok(())
}

fn check_string(primitive: PrimitiveType, text: &str, path: &str) -> Result<Value> {
    if primitive == PrimitiveType::Xhtml {
        check_xhtml(text, path)?;
    }
    if let Some(rule) = lexical_rule(primitive) {
        if !rule.is_match(text) {
            return Err(FormatError::mismatch(path, primitive.name(), text));
        }
    }
    Ok(Value::String(text.to_string()))
}

/// Parse decimal text, keeping its scale (`1.50` stays `1.50`)
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed != text {
        return None;
    }
    if trimmed.contains(['e', 'E']) {
        Decimal::from_scientific(trimmed).ok()
    } else {
        Decimal::from_str(trimmed).ok()
    }
}

/// Coerce a JSON value to the declared primitive
pub fn from_json(primitive: PrimitiveType, value: &JsonValue, path: &str) -> Result<Value> {
    let mismatch = || FormatError::mismatch(path, primitive.name(), value.to_string());

    match (primitive, value) {
        (PrimitiveType::Boolean, JsonValue::Bool(b)) => Ok(Value::Boolean(*b)),
        (
            PrimitiveType::Integer | PrimitiveType::UnsignedInt | PrimitiveType::PositiveInt,
            JsonValue::Number(n),
        ) => {
            let int = n.as_i64().ok_or_else(mismatch)?;
            check_integer(primitive, int, &n.to_string(), path)
        }
        (PrimitiveType::Decimal, JsonValue::Number(n)) => parse_decimal(&n.to_string())
            .map(Value::Decimal)
            .ok_or_else(mismatch),
        (primitive, JsonValue::String(s)) if !matches!(
            primitive,
            PrimitiveType::Boolean
                | PrimitiveType::Integer
                | PrimitiveType::UnsignedInt
                | PrimitiveType::PositiveInt
                | PrimitiveType::Decimal
        ) =>
        {
            check_string(primitive, s, path)
        }
        _ => Err(mismatch()),
    }
}

/// Coerce the `value` attribute of an XML primitive element
pub fn from_text(primitive: PrimitiveType, text: &str, path: &str) -> Result<Value> {
    match primitive {
        PrimitiveType::Boolean => match text {
            "true" => Ok(Value::Boolean(true)),
            "false" => Ok(Value::Boolean(false)),
            _ => Err(FormatError::mismatch(path, primitive.name(), text)),
        },
        PrimitiveType::Integer | PrimitiveType::UnsignedInt | PrimitiveType::PositiveInt => {
            let int = Some(text)
                .filter(|text| INTEGER.is_match(text))
                .and_then(|text| text.parse::<i64>().ok())
                .ok_or_else(|| FormatError::mismatch(path, primitive.name(), text))?;
            check_integer(primitive, int, text, path)
        }
        PrimitiveType::Decimal => parse_decimal(text)
            .map(Value::Decimal)
            .ok_or_else(|| FormatError::mismatch(path, primitive.name(), text)),
        _ => check_string(primitive, text, path),
    }
}

/// JSON form of a primitive value
pub fn to_json(value: &Value, path: &str) -> Result<JsonValue> {
    match value {
        Value::Boolean(b) => Ok(JsonValue::Bool(*b)),
        Value::Integer(i) => Ok(JsonValue::Number(Number::from(*i))),
        Value::Decimal(d) => Number::from_str(&d.to_string())
            .map(JsonValue::Number)
            .map_err(|_| FormatError::mismatch(path, "decimal", d.to_string())),
        Value::String(s) => Ok(JsonValue::String(s.clone())),
        other => Err(FormatError::mismatch(path, "primitive", other.describe())),
    }
}

/// Text of the XML `value` attribute for a primitive value
pub fn to_text(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::String(s) => Ok(s.clone()),
        other => Err(FormatError::mismatch(path, "primitive", other.describe())),
    }
}

/// Primitive type named by a choice suffix (`DateTime` -> `dateTime`)
pub fn from_suffix(suffix: &str) -> Option<PrimitiveType> {
    let mut chars = suffix.chars();
    let first = chars.next()?;
    let code: String = first.to_lowercase().chain(chars).collect();
    PrimitiveType::from_name(&code)
}

/// JSON form of XML primitive text when no field spec is available
pub fn text_to_json(primitive: Option<PrimitiveType>, text: &str) -> JsonValue {
    let parsed = match primitive {
        Some(primitive) => from_text(primitive, text, "").and_then(|value| to_json(&value, "")),
        None => Ok(JsonValue::String(text.to_string())),
    };
    parsed.unwrap_or_else(|_| JsonValue::String(text.to_string()))
}
