//! Error types for the openlist_batch crate.

use thiserror::Error;

/// Errors that can occur while talking to OpenList or preparing mounts.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to decode JSON: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Invalid descriptor {descriptor:?}: {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    #[error("Tenant index {index} out of range, expected 1-{count}")]
    TenantOutOfRange { index: i64, count: usize },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: i64, message: String },

    #[error("Failed to save configuration: {0}")]
    PersistError(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Failed to read configuration file: {0}")]
    ConfigFileError(#[from] std::io::Error),

    #[error("Failed to parse configuration YAML: {0}")]
    ConfigParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No embedded template named {0}")]
    TemplateNotFound(String),
}

impl BatchError {
    pub(crate) fn invalid_descriptor(descriptor: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for BatchError.
pub type Result<T> = std::result::Result<T, BatchError>;
