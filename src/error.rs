//! Crate-level error types for the governance core.

use thiserror::Error;

/// Errors surfaced by the governance core
#[derive(Debug, Error)]
pub enum CgpError {
    /// Malformed message, out-of-range score, or missing required field.
    /// Surfaced at the API boundary; never mutates state.
    #[error("validation error: {0}")]
    Validation(String),

    /// Risk weight configuration does not sum to ~1.0
    #[error("invalid risk weights: {0}")]
    InvalidWeights(String),

    /// Malformed policy document detected at load time
    #[error("policy load error: {0}")]
    PolicyLoad(String),

    /// Record lookup failed
    #[error("not found: {0}")]
    NotFound(String),

    /// Memory store persistence failure; no partial state is committed
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Decision does not permit the requested operation
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CgpError>;

impl CgpError {
    /// Shorthand for validation failures
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
