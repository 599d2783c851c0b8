//! Error types for the replay catalog
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the replay catalog
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (missing replay directory, missing connection string)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Participant resolution failed (store unavailable, timeout, malformed rows)
    #[error("Participant resolver error ({resolver}): {message}")]
    Resolver {
        /// Resolver name
        resolver: String,
        /// Error message
        message: String,
    },

    /// Catalog store errors
    #[error("Catalog store error: {0}")]
    CatalogStore(String),

    /// A commit would have produced a duplicate catalog key
    #[error("Commit conflict: replay {0} is already cataloged")]
    CommitConflict(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a resolver error
    pub fn resolver(resolver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolver {
            resolver: resolver.into(),
            message: message.into(),
        }
    }

    /// Create a catalog store error
    pub fn catalog_store(msg: impl Into<String>) -> Self {
        Self::CatalogStore(msg.into())
    }

    /// Create a commit conflict error for the given location
    pub fn commit_conflict(location: impl Into<String>) -> Self {
        Self::CommitConflict(location.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
