//! Arrival handling: gate, analyze, publish.
//!
//! ```text
//! on_file_arrived(id, file)
//!      │
//!      ▼
//! DatasetRegistry::record_arrival ──► Ignored / Waiting / AlreadyAnalyzed
//!      │ Triggered
//!      ▼
//! DatasetLocator::locate ──► DatasetAnalyzer::analyze (blocking pool)
//!      │
//!      ├─► Ok  ──► ResultPublisher::publish_result
//!      └─► Err ──► ResultPublisher::publish_failure
//!      │
//!      ▼
//! DatasetRegistry::mark_finished
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cube_processor::{Reconstruction, ReconstructionDriver};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::publish::ResultPublisher;
use crate::registry::{AnalysisOutcome, ArrivalDecision, DatasetId, DatasetRegistry};

/// Maps a dataset id to the directory holding its files.
pub trait DatasetLocator: Send + Sync {
    fn locate(&self, id: &DatasetId) -> PathBuf;
}

/// Datasets live at `<data_dir>/<dataset_id>`.
#[derive(Debug, Clone)]
pub struct DirectoryLocator {
    data_dir: PathBuf,
}

impl DirectoryLocator {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl DatasetLocator for DirectoryLocator {
    fn locate(&self, id: &DatasetId) -> PathBuf {
        self.data_dir.join(id.as_str())
    }
}

/// Turns a complete dataset directory into a temperature map.
///
/// Called on a blocking thread; implementations may use the CPU freely.
pub trait DatasetAnalyzer: Send + Sync {
    fn analyze(&self, root: &Path) -> cube_processor::Result<Reconstruction>;
}

impl DatasetAnalyzer for ReconstructionDriver {
    fn analyze(&self, root: &Path) -> cube_processor::Result<Reconstruction> {
        self.reconstruct(root)
    }
}

/// Routes file arrivals through the completeness gate and runs each
/// dataset's analysis at most once.
#[derive(Clone)]
pub struct ArrivalCoordinator {
    registry: Arc<DatasetRegistry>,
    locator: Arc<dyn DatasetLocator>,
    analyzer: Arc<dyn DatasetAnalyzer>,
    publisher: Arc<dyn ResultPublisher>,
}

impl ArrivalCoordinator {
    pub fn new(
        registry: Arc<DatasetRegistry>,
        locator: Arc<dyn DatasetLocator>,
        analyzer: Arc<dyn DatasetAnalyzer>,
        publisher: Arc<dyn ResultPublisher>,
    ) -> Self {
        Self {
            registry,
            locator,
            analyzer,
            publisher,
        }
    }

    pub fn registry(&self) -> &Arc<DatasetRegistry> {
        &self.registry
    }

    /// Record an arrival and, if it completes the dataset, analyze and
    /// publish before returning.
    pub async fn on_file_arrived(&self, id: &DatasetId, file_name: &str) -> ArrivalDecision {
        let decision = self.registry.record_arrival(id, file_name);
        if decision == ArrivalDecision::Triggered {
            // Failures are already logged and recorded in the registry.
            if let Err(e) = self.process(id).await {
                debug!(dataset = %id, error = %e, "Processing ended with an error");
            }
        }
        decision
    }

    /// Record an arrival and, if it completes the dataset, start the
    /// analysis in the background.
    pub fn dispatch(&self, id: &DatasetId, file_name: &str) -> ArrivalDecision {
        let decision = self.registry.record_arrival(id, file_name);
        if decision == ArrivalDecision::Triggered {
            let coordinator = self.clone();
            let id = id.clone();
            tokio::spawn(async move {
                if let Err(e) = coordinator.process(&id).await {
                    debug!(dataset = %id, error = %e, "Background processing ended with an error");
                }
            });
        }
        decision
    }

    /// Analyze a claimed dataset, publish the outcome and record it.
    ///
    /// Callers must hold the claim, i.e. have seen
    /// [`ArrivalDecision::Triggered`] for `id`.
    #[instrument(skip_all, fields(dataset = %id))]
    pub async fn process(&self, id: &DatasetId) -> Result<AnalysisOutcome> {
        let root = self.locator.locate(id);
        info!(root = %root.display(), "Starting analysis");

        let analyzer = Arc::clone(&self.analyzer);
        let analysis = tokio::task::spawn_blocking(move || analyzer.analyze(&root)).await;

        let published = match analysis {
            Ok(Ok(result)) => self
                .publisher
                .publish_result(id, &result)
                .await
                .map(|_| AnalysisOutcome::Succeeded),
            Ok(Err(e)) => {
                error!(error = %e, "Analysis failed");
                let reason = e.to_string();
                self.publisher
                    .publish_failure(id, &e)
                    .await
                    .map(|_| AnalysisOutcome::Failed { reason })
            }
            Err(e) => {
                error!(error = %e, "Analysis task did not complete");
                let reason = format!("analysis task did not complete: {}", e);
                self.registry.mark_finished(
                    id,
                    AnalysisOutcome::Failed {
                        reason: reason.clone(),
                    },
                );
                return Err(IngestionError::Join(reason));
            }
        };

        match published {
            Ok(outcome) => {
                self.registry.mark_finished(id, outcome.clone());
                info!(outcome = ?outcome, "Dataset finished");
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Publishing failed");
                self.registry.mark_finished(
                    id,
                    AnalysisOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }
}
