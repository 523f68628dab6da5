//! Error types for ENVI parsing operations.

use thiserror::Error;

/// Result type for ENVI parser operations.
pub type EnviResult<T> = Result<T, EnviError>;

/// Error types for ENVI parsing.
#[derive(Error, Debug)]
pub enum EnviError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed header text
    #[error("Invalid ENVI header: {0}")]
    HeaderParse(String),

    /// Required header field not present
    #[error("Missing required header field: {0}")]
    MissingField(&'static str),

    /// `data type` code we cannot decode
    #[error("Unsupported ENVI data type: {0}")]
    UnsupportedDataType(u32),

    /// `interleave` value other than bsq/bil/bip
    #[error("Unsupported interleave: {0}")]
    UnsupportedInterleave(String),

    /// Binary payload shorter than the header declares
    #[error("Binary size mismatch: expected at least {expected} bytes, found {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

impl EnviError {
    /// Create a HeaderParse error.
    pub fn header(msg: impl Into<String>) -> Self {
        Self::HeaderParse(msg.into())
    }
}
