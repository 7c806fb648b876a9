//! Error types for FHIR records

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown field '{field}' on {type_name}")]
    UnknownField { type_name: String, field: String },

    #[error("Invalid value for {path}: {message}")]
    InvalidFieldValue { path: String, message: String },

    #[error("Invalid FHIR resource: {0}")]
    InvalidResource(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
