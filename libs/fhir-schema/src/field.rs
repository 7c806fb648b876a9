//! Field specifications: cardinality, declared types and choice alternatives

use crate::binding::ValueSetBinding;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Maximum occurrences of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Max {
    Bounded(u32),
    Unbounded,
}

impl Max {
    pub fn admits(&self, count: usize) -> bool {
        match self {
            Max::Bounded(max) => count <= *max as usize,
            Max::Unbounded => true,
        }
    }
}

impl fmt::Display for Max {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Max::Bounded(n) => write!(f, "{}", n),
            Max::Unbounded => write!(f, "*"),
        }
    }
}

impl FromStr for Max {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "*" {
            return Ok(Max::Unbounded);
        }
        s.parse::<u32>()
            .map(Max::Bounded)
            .map_err(|_| Error::InvalidCardinality(format!("invalid max '{}'", s)))
    }
}

/// Cardinality of a field (min..max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    pub min: u32,
    pub max: Max,
}

impl Cardinality {
    pub const OPTIONAL: Cardinality = Cardinality::new(0, Max::Bounded(1));
    pub const REQUIRED: Cardinality = Cardinality::new(1, Max::Bounded(1));
    pub const MANY: Cardinality = Cardinality::new(0, Max::Unbounded);
    pub const AT_LEAST_ONE: Cardinality = Cardinality::new(1, Max::Unbounded);

    pub const fn new(min: u32, max: Max) -> Self {
        Self { min, max }
    }

    /// Repeating fields are carried as arrays on the wire
    pub fn is_repeating(&self) -> bool {
        match self.max {
            Max::Bounded(max) => max > 1,
            Max::Unbounded => true,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    pub fn is_required(&self) -> bool {
        self.min > 0
    }

    pub fn admits(&self, count: usize) -> bool {
        count >= self.min as usize && self.max.admits(count)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (min, max) = s
            .split_once("..")
            .ok_or_else(|| Error::InvalidCardinality(format!("expected 'min..max', got '{}'", s)))?;
        let min = min
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::InvalidCardinality(format!("invalid min in '{}'", s)))?;
        let max: Max = max.trim().parse()?;
        if let Max::Bounded(max) = max {
            if max < min {
                return Err(Error::InvalidCardinality(format!(
                    "max is lower than min in '{}'",
                    s
                )));
            }
        }
        Ok(Self { min, max })
    }
}

/// FHIR R4 primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Decimal,
    String,
    Code,
    Id,
    Markdown,
    Uri,
    Url,
    Canonical,
    Oid,
    Uuid,
    Date,
    DateTime,
    Instant,
    Time,
    Base64Binary,
    Xhtml,
}

/// In-memory representation a primitive decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    Decimal,
    String,
}

static PRIMITIVE_TYPES: phf::Map<&'static str, PrimitiveType> = phf::phf_map! {
    "boolean" => PrimitiveType::Boolean,
    "integer" => PrimitiveType::Integer,
    "unsignedInt" => PrimitiveType::UnsignedInt,
    "positiveInt" => PrimitiveType::PositiveInt,
    "decimal" => PrimitiveType::Decimal,
    "string" => PrimitiveType::String,
    "code" => PrimitiveType::Code,
    "id" => PrimitiveType::Id,
    "markdown" => PrimitiveType::Markdown,
    "uri" => PrimitiveType::Uri,
    "url" => PrimitiveType::Url,
    "canonical" => PrimitiveType::Canonical,
    "oid" => PrimitiveType::Oid,
    "uuid" => PrimitiveType::Uuid,
    "date" => PrimitiveType::Date,
    "dateTime" => PrimitiveType::DateTime,
    "instant" => PrimitiveType::Instant,
    "time" => PrimitiveType::Time,
    "base64Binary" => PrimitiveType::Base64Binary,
    "xhtml" => PrimitiveType::Xhtml,
};

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        PRIMITIVE_TYPES.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::UnsignedInt => "unsignedInt",
            Self::PositiveInt => "positiveInt",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Code => "code",
            Self::Id => "id",
            Self::Markdown => "markdown",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Canonical => "canonical",
            Self::Oid => "oid",
            Self::Uuid => "uuid",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Instant => "instant",
            Self::Time => "time",
            Self::Base64Binary => "base64Binary",
            Self::Xhtml => "xhtml",
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Boolean => PrimitiveKind::Boolean,
            Self::Integer | Self::UnsignedInt | Self::PositiveInt => PrimitiveKind::Integer,
            Self::Decimal => PrimitiveKind::Decimal,
            _ => PrimitiveKind::String,
        }
    }

    /// Primitives a terminology binding may be attached to
    pub fn is_coded(&self) -> bool {
        matches!(self, Self::Code | Self::String | Self::Uri)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete type a choice field may take
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveType),
    /// Registered datatype (e.g. `Period`, `Reference`)
    Complex(String),
}

impl TypeRef {
    pub fn from_code(code: &str) -> Self {
        match PrimitiveType::from_name(code) {
            Some(primitive) => TypeRef::Primitive(primitive),
            None => TypeRef::Complex(code.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            TypeRef::Primitive(p) => p.name(),
            TypeRef::Complex(name) => name,
        }
    }

    /// Wire suffix used by `value[x]` name mangling (`dateTime` -> `DateTime`)
    pub fn suffix(&self) -> String {
        let code = self.code();
        let mut chars = code.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn is_coded(&self) -> bool {
        match self {
            TypeRef::Primitive(p) => p.is_coded(),
            TypeRef::Complex(name) => is_coded_datatype(name),
        }
    }
}

fn is_coded_datatype(name: &str) -> bool {
    matches!(name, "Coding" | "CodeableConcept" | "Quantity")
}

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Primitive(PrimitiveType),
    /// Nested record: a registered datatype or backbone element
    Record(String),
    /// Reference datatype constrained to the listed target resource types
    Reference(Vec<String>),
    /// Inline resource, resolved through its `resourceType`
    Resource,
    /// Polymorphic `[x]` field with its ordered alternatives
    Choice(Vec<TypeRef>),
}

impl FieldKind {
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldKind::Choice(_))
    }

    pub fn alternatives(&self) -> &[TypeRef] {
        match self {
            FieldKind::Choice(alternatives) => alternatives,
            _ => &[],
        }
    }

    /// Whether a terminology binding makes sense on this kind
    pub fn is_coded(&self) -> bool {
        match self {
            FieldKind::Primitive(p) => p.is_coded(),
            FieldKind::Record(name) => is_coded_datatype(name),
            FieldKind::Choice(alternatives) => alternatives.iter().any(TypeRef::is_coded),
            FieldKind::Reference(_) | FieldKind::Resource => false,
        }
    }

    /// Type names this kind refers to and that must be registered
    pub fn referenced_types(&self) -> Vec<&str> {
        match self {
            FieldKind::Primitive(_) | FieldKind::Resource => Vec::new(),
            FieldKind::Record(name) => vec![name.as_str()],
            FieldKind::Reference(_) => vec!["Reference"],
            FieldKind::Choice(alternatives) => alternatives
                .iter()
                .filter_map(|alt| match alt {
                    TypeRef::Complex(name) => Some(name.as_str()),
                    TypeRef::Primitive(_) => None,
                })
                .collect(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Primitive(primitive) => f.write_str(primitive.name()),
            FieldKind::Record(name) => f.write_str(name),
            FieldKind::Reference(targets) if targets.is_empty() => f.write_str("Reference"),
            FieldKind::Reference(targets) => write!(f, "Reference({})", targets.join("|")),
            FieldKind::Resource => f.write_str("Resource"),
            FieldKind::Choice(alternatives) => {
                let codes: Vec<&str> = alternatives.iter().map(TypeRef::code).collect();
                write!(f, "{}", codes.join("|"))
            }
        }
    }
}

/// One declared field of a record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name without the `[x]` marker (e.g. "performed")
    pub name: String,
    /// Dotted element path (e.g. "Procedure.performed[x]")
    pub path: String,
    pub cardinality: Cardinality,
    pub kind: FieldKind,
    pub binding: Option<ValueSetBinding>,
    /// Carried as an XML attribute rather than a child element
    pub xml_attribute: bool,
}

impl FieldSpec {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        cardinality: Cardinality,
        kind: FieldKind,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            cardinality,
            kind,
            binding: None,
            xml_attribute: false,
        }
    }

    pub fn with_binding(mut self, binding: ValueSetBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn as_xml_attribute(mut self) -> Self {
        self.xml_attribute = true;
        self
    }

    pub fn is_repeating(&self) -> bool {
        self.cardinality.is_repeating()
    }

    pub fn is_required(&self) -> bool {
        self.cardinality.is_required()
    }

    pub fn is_choice(&self) -> bool {
        self.kind.is_choice()
    }

    /// Look up a choice alternative by its type code
    pub fn alternative(&self, type_code: &str) -> Option<&TypeRef> {
        self.kind
            .alternatives()
            .iter()
            .find(|alt| alt.code() == type_code)
    }

    /// Name of the field on the wire; choice fields carry the type suffix
    pub fn wire_key(&self, alternative: Option<&TypeRef>) -> String {
        match alternative {
            Some(alt) => format!("{}{}", self.name, alt.suffix()),
            None => self.name.clone(),
        }
    }
}
