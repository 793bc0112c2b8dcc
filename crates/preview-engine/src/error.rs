//! Error types for the preview engine

use thiserror::Error;

/// Result type alias using PreviewError
pub type Result<T> = std::result::Result<T, PreviewError>;

/// Errors raised while turning generated source into a runnable program
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// None of the primary-symbol patterns matched
    #[error("could not identify a component in the generated code")]
    NameResolution,

    /// JSX or TypeScript syntax the rewriter could not make sense of
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl NormalizeError {
    /// Build a syntax error, computing the 1-based line of `offset` in `source`
    pub fn syntax_at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let offset = offset.min(source.len());
        let line = source.as_bytes()[..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count()
            + 1;
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised while assembling or loading a program into a sandbox
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SandboxLoadError {
    /// The program could not be assembled
    #[error("failed to assemble preview program: {0}")]
    Assembly(String),

    /// The script engine rejected or aborted the program
    #[error("script error: {0}")]
    Script(String),

    /// The program did not settle within the configured timeout
    #[error("sandbox timed out after {0}ms")]
    Timeout(u64),

    /// The sandbox was destroyed while its program was still running
    #[error("sandbox was destroyed before it settled")]
    Cancelled,

    /// The sandbox worker died before reporting
    #[error("sandbox worker panicked: {0}")]
    Panicked(String),

    /// The render harness report could not be understood
    #[error("malformed harness report: {0}")]
    MalformedReport(String),
}

/// Errors raised by the property panel setters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("unknown property '{0}'")]
    Unknown(String),

    #[error("property '{name}' expects a {expected} value")]
    KindMismatch { name: String, expected: &'static str },

    #[error("'{value}' is not an option of property '{name}'. Expected one of: {options}")]
    InvalidOption {
        name: String,
        value: String,
        options: String,
    },
}

/// Umbrella error for the preview engine
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    SandboxLoad(#[from] SandboxLoadError),

    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Mock bindings must be plain identifiers
    #[error("invalid mock binding name '{0}'")]
    InvalidMockName(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_line() {
        let source = "line one\nline two\n<div>";
        let err = NormalizeError::syntax_at(source, source.len(), "unterminated element");
        assert_eq!(
            err,
            NormalizeError::Syntax {
                line: 3,
                message: "unterminated element".to_string()
            }
        );
    }

    #[test]
    fn test_name_resolution_message() {
        assert_eq!(
            NormalizeError::NameResolution.to_string(),
            "could not identify a component in the generated code"
        );
    }
}
