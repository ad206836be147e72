//! Error types for the format adapters.

use thiserror::Error;

/// Errors that can occur while reading or writing calendar text.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The input was not valid JSON, or events could not be serialized.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is not a readable iCalendar stream.
    #[error("iCalendar parse error: {0}")]
    Ics(String),

    /// The input parsed but its top-level shape holds no events.
    #[error("Unsupported input shape: {0}")]
    Shape(String),

    /// The requested format name or file extension is not recognized.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

/// Convenience alias used throughout almanac-formats.
pub type Result<T> = std::result::Result<T, FormatError>;
