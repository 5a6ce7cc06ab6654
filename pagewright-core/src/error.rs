//! Error types for Pagewright Core

use thiserror::Error;

/// Result type alias using PagewrightError
pub type Result<T> = std::result::Result<T, PagewrightError>;

/// Top-level error type for all Pagewright operations
#[derive(Debug, Error)]
pub enum PagewrightError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading a saved book file.
///
/// Loading never partially applies: on any of these the caller keeps
/// whatever book it had before.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Not a book file: missing '{expected}' signature")]
    MissingSignature { expected: &'static str },

    #[error("Line {line}: malformed header '{content}'")]
    MalformedHeader { line: usize, content: String },

    #[error("Line {line}: unknown field '{field}'")]
    UnknownField { line: usize, field: String },

    #[error("Line {line}: invalid value for '{field}': {reason}")]
    InvalidValue {
        line: usize,
        field: String,
        reason: String,
    },

    #[error("Line {line}: invalid escape sequence")]
    InvalidEscape { line: usize },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Line {line}: unexpected section marker '{content}'")]
    UnexpectedMarker { line: usize, content: String },
}

/// Errors surfaced per export attempt
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised while ingesting an image
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image is empty")]
    Empty,

    #[error("Unrecognized image format")]
    UnrecognizedFormat,

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("Invalid color for {field}: '{value}'")]
    InvalidColor { field: &'static str, value: String },

    #[error("Invalid value for {field}: '{value}'")]
    InvalidValue { field: String, value: String },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Settings store error: {0}")]
    Store(String),
}

/// Errors that occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}
