//! Common error types for Accelera

use thiserror::Error;

/// Common result type for Accelera operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Accelera services
///
/// Nothing in the reconciliation path returns these for bad record content;
/// malformed criteria are dropped or defaulted instead. These cover
/// configuration and I/O failures.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
