//! Dataset keys from relative file paths.
//!
//! Files are announced by their path relative to the data directory, e.g.
//! `2023_11_02/bench_capture_01/raw.hdr`. Everything before the last `/` is
//! the dataset id and the remainder is the file name.

use std::path::{Component, Path};

use crate::error::{IngestionError, Result};
use crate::registry::DatasetId;

/// Split `relative_path` into its dataset id and file name.
///
/// # Example
///
/// ```
/// use ingestion::parse_dataset_path;
///
/// let (id, file) = parse_dataset_path("run_7/capture_01/raw.hdr").unwrap();
/// assert_eq!(id.as_str(), "run_7/capture_01");
/// assert_eq!(file, "raw.hdr");
/// ```
pub fn parse_dataset_path(relative_path: &str) -> Result<(DatasetId, String)> {
    let trimmed = relative_path.trim().trim_start_matches("./");
    let split = trimmed.rfind('/').ok_or_else(|| {
        IngestionError::invalid_path(format!("'{}' has no dataset folder", relative_path))
    })?;

    let (folder, file) = (&trimmed[..split], &trimmed[split + 1..]);
    if file.is_empty() {
        return Err(IngestionError::invalid_path(format!(
            "'{}' has no file name",
            relative_path
        )));
    }

    validate_dataset_id(folder)?;
    Ok((DatasetId::new(folder), file.to_string()))
}

/// Reject ids that are empty or would resolve outside the data directory.
pub fn validate_dataset_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(IngestionError::invalid_path("dataset id is empty"));
    }
    let escapes = Path::new(id)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(IngestionError::invalid_path(format!(
            "dataset id '{}' must be a relative path without '..'",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        let (id, file) = parse_dataset_path("capture_01/frameIndex.txt").unwrap();
        assert_eq!(id, DatasetId::from("capture_01"));
        assert_eq!(file, "frameIndex.txt");
    }

    #[test]
    fn test_nested_folder_splits_on_last_slash() {
        let (id, file) = parse_dataset_path("a/b/c/whiteReference").unwrap();
        assert_eq!(id.as_str(), "a/b/c");
        assert_eq!(file, "whiteReference");
    }

    #[test]
    fn test_leading_dot_slash() {
        let (id, _) = parse_dataset_path("./capture_01/raw").unwrap();
        assert_eq!(id.as_str(), "capture_01");
    }

    #[test]
    fn test_invalid_paths() {
        for path in ["raw.hdr", "capture_01/", "/raw", "../etc/passwd", "/abs/raw", ""] {
            assert!(
                matches!(parse_dataset_path(path), Err(IngestionError::InvalidPath(_))),
                "{:?} should be rejected",
                path
            );
        }
    }
}
