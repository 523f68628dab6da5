//! Delivery of reconstruction results.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cube_processor::{ProcessorError, Reconstruction, ReconstructionSummary};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{IngestionError, Result};
use crate::npy::encode_f64_2d;
use crate::registry::DatasetId;

/// File name of the temperature map inside a dataset's output directory.
pub const RESULT_FILE: &str = "result.npy";
/// File name of the run summary.
pub const SUMMARY_FILE: &str = "result.json";
/// File name written instead of a result when analysis fails.
pub const ERROR_FILE: &str = "error.json";

/// Receives the outcome of every analysis.
#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish_result(&self, id: &DatasetId, result: &Reconstruction) -> Result<()>;

    async fn publish_failure(&self, id: &DatasetId, error: &ProcessorError) -> Result<()>;
}

/// Contents of `result.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub dataset_id: DatasetId,
    pub completed_at: DateTime<Utc>,
    pub rows: usize,
    pub cols: usize,
    pub failure_sentinel: f64,
    pub summary: ReconstructionSummary,
}

/// Contents of `error.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub dataset_id: DatasetId,
    pub failed_at: DateTime<Utc>,
    pub error: String,
}

/// Writes results under `<output_dir>/<dataset_id>/`.
#[derive(Debug, Clone)]
pub struct NpyResultPublisher {
    output_dir: PathBuf,
}

impl NpyResultPublisher {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding the outputs of `id`.
    pub fn dataset_dir(&self, id: &DatasetId) -> PathBuf {
        self.output_dir.join(id.as_str())
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)
            .map_err(|e| IngestionError::publish(format!("failed to serialize: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultPublisher for NpyResultPublisher {
    async fn publish_result(&self, id: &DatasetId, result: &Reconstruction) -> Result<()> {
        let dir = self.dataset_dir(id);
        tokio::fs::create_dir_all(&dir).await?;

        let map = &result.map;
        let bytes = encode_f64_2d(map.rows(), map.cols(), map.values())?;
        let path = dir.join(RESULT_FILE);
        tokio::fs::write(&path, bytes).await?;

        let record = ResultRecord {
            dataset_id: id.clone(),
            completed_at: Utc::now(),
            rows: map.rows(),
            cols: map.cols(),
            failure_sentinel: map.sentinel(),
            summary: result.summary.clone(),
        };
        Self::write_json(&dir.join(SUMMARY_FILE), &record).await?;

        // A successful rerun supersedes an earlier failure.
        match tokio::fs::remove_file(dir.join(ERROR_FILE)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        info!(dataset = %id, path = %path.display(), "Published temperature map");
        Ok(())
    }

    async fn publish_failure(&self, id: &DatasetId, error: &ProcessorError) -> Result<()> {
        let dir = self.dataset_dir(id);
        tokio::fs::create_dir_all(&dir).await?;

        let record = FailureRecord {
            dataset_id: id.clone(),
            failed_at: Utc::now(),
            error: error.to_string(),
        };
        Self::write_json(&dir.join(ERROR_FILE), &record).await?;

        info!(dataset = %id, "Published analysis failure");
        Ok(())
    }
}
