//! Error types for the artifact store

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during store operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(savepoint::store::io),
        help("Check file permissions and ensure the store root is writable")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "rename")
        operation: String,
    },

    /// Artifact key not found
    #[error("Artifact not found: {key}")]
    #[diagnostic(
        code(savepoint::store::not_found),
        help("The artifact was never stored or was removed externally")
    )]
    NotFound {
        /// The key that was not found
        key: String,
    },

    /// Malformed artifact key
    #[error("Invalid artifact key: {key:?}")]
    #[diagnostic(
        code(savepoint::store::invalid_key),
        help("Keys must be non-empty and contain only filesystem-safe characters")
    )]
    InvalidKey {
        /// The rejected key
        key: String,
    },
}

impl Error {
    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an invalid key error
    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;
