//! Startup catch-up and periodic registry eviction.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use ingestion::{ArrivalCoordinator, ArrivalDecision, DatasetId, DatasetRegistry};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// What a scan of the data directory found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_seen: usize,
    pub datasets_seen: usize,
    pub triggered: Vec<DatasetId>,
}

/// Replay every `<data_dir>/<dataset>/<file>` already on disk as an arrival.
///
/// Complete datasets are analyzed before this returns. Datasets that were
/// already analyzed in this process are not analyzed again.
pub async fn scan_existing(coordinator: &ArrivalCoordinator, data_dir: &Path) -> ScanReport {
    let mut arrivals: Vec<(DatasetId, String)> = WalkDir::new(data_dir)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let dataset = entry.path().parent()?.file_name()?.to_str()?.to_string();
            let file = entry.file_name().to_str()?.to_string();
            Some((DatasetId::new(dataset), file))
        })
        .collect();
    arrivals.sort();

    let mut report = ScanReport {
        files_seen: arrivals.len(),
        ..Default::default()
    };
    let mut last: Option<&DatasetId> = None;
    for (id, file) in &arrivals {
        if last != Some(id) {
            report.datasets_seen += 1;
            last = Some(id);
        }
        let decision = coordinator.on_file_arrived(id, file).await;
        debug!(dataset = %id, file = %file, decision = ?decision, "Replayed arrival");
        if decision == ArrivalDecision::Triggered {
            report.triggered.push(id.clone());
        }
    }

    info!(
        files = report.files_seen,
        datasets = report.datasets_seen,
        triggered = report.triggered.len(),
        "Scanned data directory"
    );
    report
}

/// Drop finished datasets older than `retention`.
pub fn evict_once(registry: &DatasetRegistry, retention: Duration) -> usize {
    let cutoff = chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| Utc::now().checked_sub_signed(retention));
    // Nothing finished that long ago.
    let Some(cutoff) = cutoff else {
        return 0;
    };
    let evicted = registry.evict_finished_before(cutoff);
    if evicted > 0 {
        info!(evicted = evicted, remaining = registry.len(), "Evicted finished datasets");
    }
    evicted
}

/// Run [`evict_once`] every `interval` until the task is aborted.
pub fn spawn_eviction(
    coordinator: ArrivalCoordinator,
    interval: Duration,
    retention: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            evict_once(coordinator.registry(), retention);
        }
    })
}
