//! Error types for Coursewise.

use thiserror::Error;

/// Library-level error type for Coursewise operations.
#[derive(Error, Debug)]
pub enum CoursewiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Model backend error: {0}")]
    Backend(String),

    #[error("Model backend call timed out after {0} seconds")]
    BackendTimeout(u64),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl CoursewiseError {
    /// Whether this error came from the model backend call itself.
    ///
    /// These are the only failures that abort a query.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            CoursewiseError::Backend(_)
                | CoursewiseError::BackendTimeout(_)
                | CoursewiseError::OpenAI(_)
                | CoursewiseError::Http(_)
        )
    }
}

/// Result type alias for Coursewise operations.
pub type Result<T> = std::result::Result<T, CoursewiseError>;
