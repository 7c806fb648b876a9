//! Error types for the wire codecs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    /// The document is not syntactically valid JSON or XML
    #[error("malformed {format} document: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("expected a JSON object at {0}")]
    ExpectedObject(String),

    #[error("missing resourceType at {0}")]
    MissingResourceType(String),

    /// A value does not have the shape or lexical form of its declared type
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// More than one alternative of a choice field is populated
    #[error("conflicting choice at {path}: {}", .alternatives.join(", "))]
    ConflictingChoice {
        path: String,
        alternatives: Vec<String>,
    },

    /// A record was encoded against the spec of a different type
    #[error("record of type {record} cannot be encoded as {spec}")]
    SpecMismatch { record: String, spec: String },

    #[error(transparent)]
    Schema(#[from] ferrum_schema::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl FormatError {
    pub(crate) fn mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        FormatError::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn malformed_json(error: serde_json::Error) -> Self {
        FormatError::Malformed {
            format: "JSON",
            message: error.to_string(),
        }
    }

    pub(crate) fn malformed_xml(error: roxmltree::Error) -> Self {
        FormatError::Malformed {
            format: "XML",
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatError>;
