//! Error types for JSON parsing and pointer handling.

use thiserror::Error;

/// Result type alias for jschema-json operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a `JsonValue`.
#[derive(Debug, Error)]
pub enum Error {
    /// The text is not valid JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A pointer could not be parsed or evaluated.
    #[error(transparent)]
    Pointer(#[from] JsonPointerError),
}

/// Errors produced by JSON Pointer parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonPointerError {
    /// A non-empty pointer must start with '/'.
    #[error("JSON pointer '{0}' must be empty or start with '/'")]
    MissingLeadingSlash(String),

    /// '~' must be followed by '0' or '1'.
    #[error("JSON pointer '{0}' contains an invalid '~' escape")]
    InvalidEscape(String),

    /// A URI fragment contained a malformed percent-encoding.
    #[error("URI fragment '{0}' is not validly percent-encoded")]
    InvalidPercentEncoding(String),

    /// The pointer does not reference a value in the document.
    #[error("JSON pointer '{0}' does not reference a value")]
    NotFound(String),
}
