//! FHIR record type specifications
//!
//! Describes resources, datatypes and backbone elements as data: which fields
//! a record type has, how often they may occur, which concrete types a choice
//! field admits and which value sets constrain coded fields. Codecs and the
//! validator are driven entirely by these specs, looked up by type name in a
//! [`SchemaRegistry`].

pub mod binding;
pub mod definition;
pub mod error;
pub mod field;
pub mod r4;
pub mod record;
pub mod registry;

pub use binding::{BindingStrength, ValueSetBinding};
pub use definition::{DefinitionKind, ElementDefinition, TypeDefinition};
pub use error::{Error, Result};
pub use field::{Cardinality, FieldKind, FieldSpec, Max, PrimitiveKind, PrimitiveType, TypeRef};
pub use record::{RecordTypeSpec, TypeCategory};
pub use registry::SchemaRegistry;
