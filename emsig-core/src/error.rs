//! Structured error types for the emsig workspace.

use thiserror::Error;

/// Unified error type for all emsig operations.
#[derive(Debug, Error)]
pub enum EmsigError {
    /// I/O error (config file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed configuration or input data)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required run input is missing or inconsistent. Raised before any
    /// parallel work is submitted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A statistic is undefined for the given inputs (degenerate
    /// hypergeometric parameters, empty rank sample, ...).
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl EmsigError {
    /// Whether this error only invalidates a single comparison.
    pub fn is_arithmetic(&self) -> bool {
        matches!(self, EmsigError::Arithmetic(_))
    }
}

/// Convenience alias used throughout the emsig workspace.
pub type Result<T> = std::result::Result<T, EmsigError>;
