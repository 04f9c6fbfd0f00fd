//! Error types for the COMPADRE helper.
//!
//! Load-phase errors are fatal and end the process before the socket opens.
//! Request-phase errors only fail the response they belong to.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the COMPADRE helper.
#[derive(Debug, Error)]
pub enum CompadreError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Segment file errors
    #[error("Unrecognized segment file type. Please refer to the README for formatting guidelines.")]
    UnrecognizedFormat { columns: usize },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    // Protocol errors
    #[error("Malformed request ({field}): {message}")]
    MalformedRequest { field: String, message: String },

    // Estimator errors
    #[error("Estimator failed: {message}")]
    Estimator { message: String },
}

/// Result type alias for COMPADRE operations.
pub type Result<T> = std::result::Result<T, CompadreError>;

impl From<std::io::Error> for CompadreError {
    fn from(err: std::io::Error) -> Self {
        CompadreError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for CompadreError {
    fn from(err: serde_json::Error) -> Self {
        CompadreError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl CompadreError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CompadreError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a parse error for a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        CompadreError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a malformed request error.
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        CompadreError::MalformedRequest {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an estimator error.
    pub fn estimator(message: impl Into<String>) -> Self {
        CompadreError::Estimator {
            message: message.into(),
        }
    }

    /// Whether this is a segment file content error, which stops the
    /// process rather than a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompadreError::UnrecognizedFormat { .. } | CompadreError::Parse { .. }
        )
    }
}

/// Extension trait attaching a path to IO results.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CompadreError::io_with_path(e, path))
    }
}
