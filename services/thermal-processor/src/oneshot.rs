//! Analyze a single dataset without starting the server.

use anyhow::{bail, Context, Result};
use ingestion::{validate_dataset_id, AnalysisOutcome, ArrivalDecision, DatasetId, REQUIRED_FILES};
use tracing::info;

use crate::config::ServiceConfig;
use crate::state::build_coordinator;

/// Gate `<data_dir>/<dataset_id>` on the files present on disk, then analyze
/// and publish it.
///
/// Fails without analyzing if any required file is missing, and fails
/// after publishing `error.json` if the analysis itself fails.
pub async fn analyze_once(config: &ServiceConfig, dataset_id: &str) -> Result<AnalysisOutcome> {
    validate_dataset_id(dataset_id)?;
    let id = DatasetId::new(dataset_id);
    let root = config.data_dir.join(dataset_id);
    if !root.is_dir() {
        bail!("dataset directory {:?} does not exist", root);
    }

    let coordinator = build_coordinator(config)?;
    let mut decision = ArrivalDecision::Ignored;
    for name in REQUIRED_FILES {
        if root.join(name).is_file() {
            decision = coordinator.registry().record_arrival(&id, name);
        }
    }

    match decision {
        ArrivalDecision::Triggered => {}
        ArrivalDecision::Waiting { missing } => {
            bail!("dataset '{}' is incomplete, missing: {}", id, missing.join(", "))
        }
        _ => bail!("dataset '{}' has none of the required files", id),
    }

    info!(dataset = %id, "Analyzing dataset");
    let outcome = coordinator
        .process(&id)
        .await
        .with_context(|| format!("Failed to process dataset '{}'", id))?;
    if let AnalysisOutcome::Failed { reason } = &outcome {
        bail!("analysis of dataset '{}' failed: {}", id, reason);
    }
    Ok(outcome)
}
