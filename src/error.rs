//! Error types for xiaoya-teacher-mcp

use reqwest::StatusCode;

/// xiaoya-teacher-mcp error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable credentials for the current request or process
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform answered with a non-success status or envelope
    #[error("Platform API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// Tool input rejected before any request was sent
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn api(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }
}

/// Result type alias for xiaoya-teacher-mcp
pub type Result<T> = std::result::Result<T, Error>;
