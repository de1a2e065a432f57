//! Error taxonomy shared by every layer.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The owning view was torn down before the operation finished
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether retrying the same call later could reasonably succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ExternalService(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Input validation errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("A transfer is already being submitted")]
    TransferInFlight,

    #[error("Transfer form is not ready to submit")]
    NotReady,

    #[error("{0}")]
    Multiple(String),
}

/// Failures talking to the banking backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExternalServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error ({status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Client misconfigured: {0}")]
    Configuration(String),
}

impl ExternalServiceError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Failures reading or writing the persisted session anchor
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error("Session storage failed: {0}")]
    Storage(String),

    #[error("Persisted selection is not a valid user id: {0}")]
    InvalidAnchor(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}
