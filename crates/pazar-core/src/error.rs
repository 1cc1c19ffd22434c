//! Error types for pazar-core

use thiserror::Error;

/// Result type alias using pazar-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pazar-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP failure (connect, timeout, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend rejected the request
    #[error("Backend API error: {0}")]
    Api(String),

    /// Backend uniqueness constraint violation (e.g. duplicate favorite row)
    #[error("Backend constraint violation: {0}")]
    Constraint(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a transient connectivity fault.
    ///
    /// Connectivity faults are the only errors worth retrying on a later
    /// run; everything else reflects the request itself or backend state.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        match self {
            Self::Http(error) => !error.is_decode(),
            _ => false,
        }
    }

    /// Whether this error is a backend uniqueness-constraint violation.
    #[must_use]
    pub const fn is_constraint(&self) -> bool {
        matches!(self, Self::Constraint(_))
    }
}
