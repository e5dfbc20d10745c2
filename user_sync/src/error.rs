//! Error types for UserSync

use thiserror::Error;

/// Result type for UserSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for UserSync
///
/// Every stage of the pipeline returns this type unchanged up to the binary,
/// which is the only place that turns it into an exit code.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    ConfigError(String),

    #[error("Database connection error: {0}")]
    ConnectionError(#[source] sqlx::Error),

    #[error("Database query error: {0}")]
    QueryError(#[source] sqlx::Error),

    #[error("API request timed out after {timeout_ms} ms")]
    TimeoutError { timeout_ms: u128 },

    #[error("API Error: {status} {status_text}")]
    ApiError { status: u16, status_text: String },

    #[error("API transport error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Short, stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ConfigError(_) => "configuration",
            Error::ConnectionError(_) => "connection",
            Error::QueryError(_) => "query",
            Error::TimeoutError { .. } => "timeout",
            Error::ApiError { .. } => "api",
            Error::TransportError(_) => "transport",
            Error::SerializationError(_) => "serialization",
            Error::IoError(_) => "io",
        }
    }
}

/// Convert Serde JSON errors to UserSync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}
