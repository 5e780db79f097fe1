//! Error types for the GraphFrame SDK

use thiserror::Error;

/// Result type alias for GraphFrame operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when using the GraphFrame SDK
#[derive(Debug, Error)]
pub enum Error {
    /// Filter, field or upsert input rejected by the compiler
    #[error("Compile error: {0}")]
    Compile(#[from] graphframe_core::Error),

    /// Could not reach the database
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// API error response
    #[error("API error: {message} (status: {status})")]
    Api {
        /// Error message from API
        message: String,
        /// HTTP status code
        status: u16,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout,

    /// Invalid response format
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// A write plan failed to execute
    #[error("Write error: {message}")]
    Write {
        /// What failed
        message: String,
        /// Underlying driver error, if any
        #[source]
        source: Option<Box<Error>>,
    },

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a driver failure raised while committing a write
    pub fn write(message: impl Into<String>, source: Error) -> Self {
        Self::Write {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
