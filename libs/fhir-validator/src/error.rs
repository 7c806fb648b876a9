use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("YAML configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON configuration error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Misuse of the validator. Conformance problems in the data are reported as
/// [`crate::Violation`]s, never as errors.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("record of type {record} cannot be validated as {spec}")]
    SpecMismatch { record: String, spec: String },

    #[error(transparent)]
    Schema(#[from] ferrum_schema::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
