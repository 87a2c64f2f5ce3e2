//! Error types for the control plane client.

use thiserror::Error;

use oca_template::TemplateError;

/// Errors that can occur while talking to the control plane.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Building or parsing a template failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The transport failed or the control plane returned a fault.
    /// The message is passed through untouched.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A call argument was rejected before sending.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A lookup by name or attribute found nothing.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A lookup by name or attribute found several resources.
    #[error("Multiple resources match: {0}")]
    MultipleMatches(String),

    /// The response body does not have the expected shape.
    #[error("Unexpected response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Transport(e.to_string())
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
