//! Error types for pattyshack-core

use thiserror::Error;

use crate::gateway::GatewayError;

/// Result type alias using pattyshack-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pattyshack-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote data gateway error
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Operation needs connectivity and no cached fallback exists
    #[error("Offline: {0}")]
    Offline(String),

    /// Record not found in the local session state
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns the wrapped gateway error, if this is one.
    pub const fn as_gateway(&self) -> Option<&GatewayError> {
        match self {
            Self::Gateway(error) => Some(error),
            _ => None,
        }
    }
}
