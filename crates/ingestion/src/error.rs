//! Error types for the ingestion crate.

use thiserror::Error;

/// Errors that can occur while handling dataset arrivals.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to publish result: {0}")]
    Publish(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid dataset path: {0}")]
    InvalidPath(String),

    #[error("Analysis task did not complete: {0}")]
    Join(String),
}

impl IngestionError {
    /// Create a Publish error.
    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_convert() {
        fn read_missing() -> Result<Vec<u8>> {
            Ok(std::fs::read("/nonexistent/thermal/result.npy")?)
        }
        assert!(matches!(read_missing(), Err(IngestionError::Io(_))));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            IngestionError::invalid_path("'raw' has no dataset folder").to_string(),
            "Invalid dataset path: 'raw' has no dataset folder"
        );
        assert_eq!(
            IngestionError::publish("npy header too long").to_string(),
            "Failed to publish result: npy header too long"
        );
    }
}
