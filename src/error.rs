//! Error types for the task agent

use thiserror::Error;

/// Result type alias using the agent's `Error` type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error — fatal at startup, non-retryable at runtime
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider error (unreachable, non-2xx, or garbage response)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Structured memory (rusqlite) error
    #[error("Structured memory error: {0}")]
    Structured(#[from] rusqlite::Error),

    /// Vector memory error (index/record-log corruption, rebuild failure)
    #[error("Vector memory error: {0}")]
    VectorMemory(String),

    /// Sandbox execution error
    #[error("Sandbox error: {0}")]
    Sandbox(String),

    /// Tool adapter error surfaced before being converted into a StepResult
    #[error("Adapter error: {0}")]
    Adapter(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unauthorized access
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Planner failed to produce a valid plan after format-repair retry
    #[error("Planning failed: {0}")]
    Planner(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::RateLimit(_) | Error::Timeout(_) | Error::Provider(_)
        )
    }

    /// Check if error is a client error (user's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::NotFound(_) | Error::Unauthorized(_)
        )
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
