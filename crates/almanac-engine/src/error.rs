//! Error types for almanac-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Unparsable rule text or date text.
    #[error("Format error: {0}")]
    Format(String),

    /// A required field is missing or the fields are inconsistent.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Event not found: {0}")]
    NotFound(String),

    /// The input has the wrong shape for the operation (e.g. month 13).
    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
