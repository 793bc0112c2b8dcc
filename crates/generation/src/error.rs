//! Error types for component generation

use thiserror::Error;

/// Result type alias using GenerationError
pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The daemon answered with a non-success status
    #[error("Ollama request failed with {status}: {body}")]
    Status { status: u16, body: String },

    /// No code could be isolated from the model's response
    #[error("Failed to extract valid component code from response")]
    NoCodeFound,

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}
