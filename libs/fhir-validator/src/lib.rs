//! Structural validation of typed FHIR records.
//!
//! A [`Validator`] walks a [`TypedRecord`](ferrum_models::TypedRecord) against
//! the record type specs of a [`SchemaRegistry`](ferrum_schema::SchemaRegistry)
//! and collects every [`Violation`] instead of stopping at the first one:
//! - occurrence counts outside a field's cardinality
//! - codes outside the value set of a `required` binding
//!
//! Bindings that only name an external value set are checked through an
//! optional [`ValueSetResolver`]; without one they are advisory.
//!
//! ```no_run
//! use ferrum_models::TypedRecord;
//! use ferrum_validator::{Validator, ValidatorConfig, Preset};
//!
//! let registry = ferrum_schema::r4::registry()?;
//! let validator = Validator::from_config(registry, &ValidatorConfig::preset(Preset::Ingestion))?;
//!
//! let mut bundle = TypedRecord::new("Bundle");
//! bundle.set("type", "not-a-real-type");
//! for violation in validator.validate(&bundle)? {
//!     println!("{}", violation);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod error;
mod plan;
mod resolver;
mod steps;
mod validator;
mod violation;

pub use config::{
    BindingsConfig, CardinalityConfig, Preset, UnresolvedBindings, ValidatorConfig,
    ValidatorConfigBuilder,
};
pub use error::{ConfigError, Result, ValidatorError};
pub use plan::{BindingPlan, CardinalityPlan, Step, ValidationPlan};
pub use resolver::{InMemoryValueSets, ValueSetResolver};
pub use validator::{
    IssueCode, IssueSeverity, ValidationIssue, ValidationOutcome, Validator,
};
pub use violation::Violation;
