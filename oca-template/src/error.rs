//! Error types for the template layer.

use thiserror::Error;

/// Errors raised while building, querying or parsing templates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// No pair or vector carries the requested key.
    #[error("key {0} not found")]
    NotFound(String),

    /// A unique lookup matched more than one element.
    #[error("multiple entries with key {0}")]
    MultipleMatches(String),

    /// Unsupported builder value, or a value that does not convert to the
    /// requested numeric type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Malformed XML or wire text.
    #[error("parse error: {0}")]
    Parse(String),

    /// A set-once attribute group already holds the named key.
    #[error("the key {0} is already present in template")]
    KeyConflict(String),
}

impl From<quick_xml::Error> for TemplateError {
    fn from(e: quick_xml::Error) -> Self {
        TemplateError::Parse(e.to_string())
    }
}

/// Result type alias for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;
