//! Error types for the memoization engine

use miette::Diagnostic;
use thiserror::Error;

/// Error type for engine operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Misconfigured definition, watch/produce path, or call options
    #[error("Configuration error: {message}")]
    #[diagnostic(code(savepoint::engine::config))]
    Configuration {
        /// Description of the configuration issue
        message: String,
    },

    /// A value offered no deterministic canonical representation
    #[error("Cannot canonicalize value: {message}")]
    #[diagnostic(
        code(savepoint::engine::canon),
        help("Wrap bulk data in Tensor/Frame or implement Canonical for the type")
    )]
    Canon {
        /// Description of the canonicalization failure
        message: String,
    },

    /// Artifact encode/decode failure
    #[error("Serialization error: {message}")]
    #[diagnostic(code(savepoint::engine::serialization))]
    Serialization {
        /// Description of the serialization failure
        message: String,
    },

    /// Error propagated from the artifact store
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] savepoint_store::Error),
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a canonicalization error
    #[must_use]
    pub fn canon(msg: impl Into<String>) -> Self {
        Self::Canon {
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
