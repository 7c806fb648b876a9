//! Error types for record type specifications

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Record type already registered: {0}")]
    DuplicateType(String),

    #[error("Unknown record type: {0}")]
    UnknownType(String),

    #[error("Duplicate field '{field}' in record type {type_name}")]
    DuplicateField { type_name: String, field: String },

    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    #[error("Invalid definition at {path}: {message}")]
    InvalidDefinition { path: String, message: String },

    #[error("Field {path} refers to unregistered type {type_name}")]
    UnresolvedType { path: String, type_name: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
