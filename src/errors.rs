//! Error types for fixpilot
//!
//! Provides the library error enum with context propagation. Nothing in the
//! fix loop treats these as fatal: callers turn them into skipped outcomes
//! or rejected records and keep going.

use thiserror::Error;

/// Main error type for the fix-convergence engine
#[derive(Error, Debug)]
pub enum FixError {
    /// Failure record could not be ingested
    #[error("Malformed failure record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Path cannot be expressed relative to the repository root
    #[error("Path is outside repository root: {0}")]
    PathOutsideRoot(String),

    /// Protected-path rule could not be compiled
    #[error("Invalid protected-path pattern: {0}")]
    Pattern(String),

    /// Snapshot of the target file could not be taken or restored
    #[error("Backup error: {0}")]
    Backup(String),

    /// Post-edit verification rejected the change
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors with context
    #[error("Fix error: {0}")]
    Generic(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, FixError>;

/// Convert anyhow errors to FixError
impl From<anyhow::Error> for FixError {
    fn from(err: anyhow::Error) -> Self {
        FixError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FixError::MalformedRecord {
            index: 3,
            reason: "missing id".to_string(),
        };
        assert!(err.to_string().contains("index 3"));
        assert!(err.to_string().contains("missing id"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FixError = io.into();
        assert!(matches!(err, FixError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }
}
