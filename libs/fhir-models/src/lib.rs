//! FHIR records
//!
//! Resources, datatypes and backbone elements are all represented by one
//! generic [`TypedRecord`] whose shape is described by a
//! [`ferrum_schema::RecordTypeSpec`]. Records can be assembled loosely with
//! the mutation methods on [`TypedRecord`] or checked field by field through
//! [`RecordBuilder`].
//!
//! # Example
//!
//! ```rust
//! use ferrum_models::{TypedRecord, Value};
//!
//! let mut procedure = TypedRecord::new("Procedure");
//! procedure
//!     .set("status", "completed")
//!     .set_choice("performed", "dateTime", "2021-03-04");
//!
//! assert_eq!(procedure.str("status"), Some("completed"));
//! assert_eq!(
//!     procedure.choice_as("performed", "dateTime").and_then(Value::as_str),
//!     Some("2021-03-04")
//! );
//! ```

pub mod builder;
pub mod error;
pub mod record;
pub mod value;
pub mod value_set;

pub use builder::RecordBuilder;
pub use error::{Error, Result};
pub use record::TypedRecord;
pub use value::{alternative_kind, ChoiceValue, Value};
pub use value_set::{
    PublicationStatus, ValueSet, ValueSetCompose, ValueSetConcept, ValueSetExpansion,
    ValueSetExpansionContains, ValueSetInclude,
};
