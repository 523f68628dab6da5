//! Completeness tracking for capture directories.
//!
//! A capture is written file by file, in no particular order, and the same
//! file may be announced more than once. [`DatasetRegistry`] records which of
//! the [`REQUIRED_FILES`] have been seen for each dataset and hands out the
//! right to analyze it exactly once.
//!
//! Each entry moves forward through three phases and never back:
//!
//! ```text
//! Incomplete ──(last required file)──► Ready ──(claim)──► Analyzed
//! ```
//!
//! [`DatasetRegistry::record_arrival`] performs the update, readiness check
//! and claim under a single lock, so concurrent arrivals can never trigger
//! the same dataset twice.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Files that must all be present before a capture can be analyzed.
pub const REQUIRED_FILES: [&str; 9] = [
    "whiteReference",
    "whiteReference.hdr",
    "darkReference",
    "darkReference.hdr",
    "data",
    "data.hdr",
    "raw",
    "raw.hdr",
    "frameIndex.txt",
];

fn required_index(file_name: &str) -> Option<usize> {
    REQUIRED_FILES.iter().position(|name| *name == file_name)
}

/// Identifier of one capture, typically its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DatasetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Where a dataset is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Incomplete,
    Ready,
    Analyzed,
}

/// How an analysis ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Succeeded,
    Failed { reason: String },
}

/// What an arrival caused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ArrivalDecision {
    /// The file is not one of the required files.
    Ignored,
    /// Still waiting for the listed files.
    Waiting { missing: Vec<String> },
    /// This arrival completed the dataset and claimed its analysis.
    Triggered,
    /// The dataset was already claimed by an earlier arrival.
    AlreadyAnalyzed,
}

/// Per-dataset completeness record.
#[derive(Debug, Clone)]
pub struct CompletionState {
    received: [bool; REQUIRED_FILES.len()],
    analyzed: bool,
    first_seen: DateTime<Utc>,
    analyzed_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    outcome: Option<AnalysisOutcome>,
}

impl Default for CompletionState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionState {
    pub fn new() -> Self {
        Self {
            received: [false; REQUIRED_FILES.len()],
            analyzed: false,
            first_seen: Utc::now(),
            analyzed_at: None,
            finished_at: None,
            outcome: None,
        }
    }

    /// Mark `file_name` received. Returns false for names outside
    /// [`REQUIRED_FILES`].
    pub fn record(&mut self, file_name: &str) -> bool {
        match required_index(file_name) {
            Some(i) => {
                self.received[i] = true;
                true
            }
            None => false,
        }
    }

    pub fn has_received(&self, file_name: &str) -> bool {
        required_index(file_name).is_some_and(|i| self.received[i])
    }

    pub fn is_ready(&self) -> bool {
        self.received.iter().all(|r| *r)
    }

    pub fn is_analyzed(&self) -> bool {
        self.analyzed
    }

    /// Required files not yet received, in [`REQUIRED_FILES`] order.
    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_FILES
            .iter()
            .zip(self.received.iter())
            .filter(|(_, received)| !**received)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn phase(&self) -> Phase {
        if self.analyzed {
            Phase::Analyzed
        } else if self.is_ready() {
            Phase::Ready
        } else {
            Phase::Incomplete
        }
    }

    pub fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Whether analysis was claimed and its outcome recorded.
    pub fn is_finished(&self) -> bool {
        self.analyzed && self.finished_at.is_some()
    }

    /// Claim the analysis. Only a ready, unclaimed entry can be claimed.
    fn claim(&mut self) -> bool {
        if self.analyzed || !self.is_ready() {
            return false;
        }
        self.analyzed = true;
        self.analyzed_at = Some(Utc::now());
        true
    }
}

/// Point-in-time view of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub dataset_id: DatasetId,
    pub phase: Phase,
    pub received: Vec<String>,
    pub missing: Vec<String>,
    pub first_seen: DateTime<Utc>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<AnalysisOutcome>,
}

impl DatasetStatus {
    fn from_state(id: &DatasetId, state: &CompletionState) -> Self {
        Self {
            dataset_id: id.clone(),
            phase: state.phase(),
            received: REQUIRED_FILES
                .iter()
                .filter(|name| state.has_received(name))
                .map(|name| name.to_string())
                .collect(),
            missing: state.missing().into_iter().map(String::from).collect(),
            first_seen: state.first_seen,
            analyzed_at: state.analyzed_at,
            finished_at: state.finished_at,
            outcome: state.outcome.clone(),
        }
    }
}

/// Thread-safe map from dataset to completeness record.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    entries: Mutex<HashMap<DatasetId, CompletionState>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `file_name` arrived for `id`.
    ///
    /// Names outside [`REQUIRED_FILES`] are ignored and do not create an
    /// entry.
    pub fn update(&self, id: &DatasetId, file_name: &str) {
        if required_index(file_name).is_none() {
            return;
        }
        self.entries
            .lock()
            .entry(id.clone())
            .or_default()
            .record(file_name);
    }

    /// Whether every required file has been received for `id`.
    pub fn is_ready(&self, id: &DatasetId) -> bool {
        self.entries.lock().get(id).is_some_and(|s| s.is_ready())
    }

    pub fn is_analyzed(&self, id: &DatasetId) -> bool {
        self.entries.lock().get(id).is_some_and(|s| s.is_analyzed())
    }

    /// Claim the analysis of a ready dataset.
    ///
    /// Returns true only for the call that performs the transition; an
    /// incomplete, unknown or already claimed dataset returns false.
    pub fn mark_analyzed(&self, id: &DatasetId) -> bool {
        self.entries.lock().get_mut(id).is_some_and(|s| s.claim())
    }

    /// Update, check readiness and claim in one step.
    pub fn record_arrival(&self, id: &DatasetId, file_name: &str) -> ArrivalDecision {
        if required_index(file_name).is_none() {
            debug!(dataset = %id, file = %file_name, "Ignoring unrelated file");
            return ArrivalDecision::Ignored;
        }

        let mut entries = self.entries.lock();
        let state = entries.entry(id.clone()).or_default();

        if state.is_analyzed() {
            debug!(dataset = %id, file = %file_name, "Dataset already analyzed");
            return ArrivalDecision::AlreadyAnalyzed;
        }

        state.record(file_name);
        if state.claim() {
            info!(dataset = %id, file = %file_name, "Dataset complete, analysis claimed");
            return ArrivalDecision::Triggered;
        }

        let missing: Vec<String> = state.missing().into_iter().map(String::from).collect();
        debug!(dataset = %id, file = %file_name, missing = missing.len(), "Waiting for files");
        ArrivalDecision::Waiting { missing }
    }

    /// Record how the analysis of a claimed dataset ended.
    ///
    /// Returns false if `id` is unknown or was never claimed.
    pub fn mark_finished(&self, id: &DatasetId, outcome: AnalysisOutcome) -> bool {
        let mut entries = self.entries.lock();
        match entries.get_mut(id) {
            Some(state) if state.is_analyzed() => {
                state.finished_at = Some(Utc::now());
                state.outcome = Some(outcome);
                true
            }
            _ => false,
        }
    }

    /// Remove a finished entry.
    ///
    /// Entries that are not analyzed, or whose analysis is still running,
    /// are kept. Returns whether the entry was removed.
    pub fn evict(&self, id: &DatasetId) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(id).is_some_and(|s| s.is_finished()) {
            entries.remove(id);
            debug!(dataset = %id, "Evicted dataset");
            return true;
        }
        false
    }

    /// Remove every entry that finished before `cutoff`. Returns the number
    /// removed.
    pub fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, state| match state.finished_at {
            Some(finished) if state.analyzed => finished >= cutoff,
            _ => true,
        });
        before - entries.len()
    }

    pub fn status(&self, id: &DatasetId) -> Option<DatasetStatus> {
        self.entries
            .lock()
            .get(id)
            .map(|state| DatasetStatus::from_state(id, state))
    }

    /// Status of every tracked dataset, ordered by id.
    pub fn snapshot(&self) -> Vec<DatasetStatus> {
        let entries = self.entries.lock();
        let mut statuses: Vec<DatasetStatus> = entries
            .iter()
            .map(|(id, state)| DatasetStatus::from_state(id, state))
            .collect();
        statuses.sort_by(|a, b| a.dataset_id.cmp(&b.dataset_id));
        statuses
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DatasetId {
        DatasetId::from(s)
    }

    fn deliver_all(registry: &DatasetRegistry, dataset: &DatasetId) {
        for name in REQUIRED_FILES {
            registry.update(dataset, name);
        }
    }

    #[test]
    fn test_not_ready_until_all_files() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");
        for name in &REQUIRED_FILES[..8] {
            registry.update(&ds, name);
            assert!(!registry.is_ready(&ds));
        }
        registry.update(&ds, REQUIRED_FILES[8]);
        assert!(registry.is_ready(&ds));

        // Stays ready on duplicates
        registry.update(&ds, "raw");
        assert!(registry.is_ready(&ds));
    }

    #[test]
    fn test_unknown_names_ignored() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");
        registry.update(&ds, "notes.txt");
        assert!(registry.is_empty());
        assert_eq!(registry.record_arrival(&ds, "preview.png"), ArrivalDecision::Ignored);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_mark_analyzed_requires_ready() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");
        registry.update(&ds, "raw");
        assert!(!registry.mark_analyzed(&ds));
        assert!(!registry.is_analyzed(&ds));
        assert!(!registry.mark_analyzed(&id("unknown")));
    }

    #[test]
    fn test_mark_analyzed_once() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");
        deliver_all(&registry, &ds);
        assert!(registry.mark_analyzed(&ds));
        assert!(!registry.mark_analyzed(&ds));
        assert!(registry.is_analyzed(&ds));
        assert_eq!(registry.status(&ds).unwrap().phase, Phase::Analyzed);
    }

    #[test]
    fn test_record_arrival_decisions() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");

        match registry.record_arrival(&ds, "raw") {
            ArrivalDecision::Waiting { missing } => {
                assert_eq!(missing.len(), 8);
                assert!(!missing.contains(&"raw".to_string()));
            }
            other => panic!("unexpected decision {:?}", other),
        }

        for name in &REQUIRED_FILES[..8] {
            let decision = registry.record_arrival(&ds, name);
            assert!(matches!(decision, ArrivalDecision::Waiting { .. }), "{}", name);
        }
        assert_eq!(
            registry.record_arrival(&ds, "frameIndex.txt"),
            ArrivalDecision::Triggered
        );
        assert_eq!(registry.record_arrival(&ds, "raw"), ArrivalDecision::AlreadyAnalyzed);
        assert_eq!(
            registry.record_arrival(&ds, "frameIndex.txt"),
            ArrivalDecision::AlreadyAnalyzed
        );
    }

    #[test]
    fn test_datasets_are_independent() {
        let registry = DatasetRegistry::new();
        deliver_all(&registry, &id("a"));
        registry.update(&id("b"), "raw");
        assert!(registry.is_ready(&id("a")));
        assert!(!registry.is_ready(&id("b")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_evict_only_finished() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");

        registry.update(&ds, "raw");
        assert!(!registry.evict(&ds));

        deliver_all(&registry, &ds);
        assert!(!registry.evict(&ds));

        assert!(registry.mark_analyzed(&ds));
        // Claimed but still running
        assert!(!registry.evict(&ds));

        assert!(registry.mark_finished(&ds, AnalysisOutcome::Succeeded));
        assert!(registry.evict(&ds));
        assert!(registry.status(&ds).is_none());
    }

    #[test]
    fn test_mark_finished_requires_claim() {
        let registry = DatasetRegistry::new();
        let ds = id("capture_01");
        deliver_all(&registry, &ds);
        assert!(!registry.mark_finished(&ds, AnalysisOutcome::Succeeded));
    }

    #[test]
    fn test_evict_finished_before() {
        let registry = DatasetRegistry::new();
        for name in ["old", "running"] {
            let ds = id(name);
            deliver_all(&registry, &ds);
            assert!(registry.mark_analyzed(&ds));
        }
        registry.update(&id("partial"), "raw");
        registry.mark_finished(
            &id("old"),
            AnalysisOutcome::Failed {
                reason: "boom".to_string(),
            },
        );

        let removed = registry.evict_finished_before(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(removed, 1);
        assert!(registry.status(&id("old")).is_none());
        assert!(registry.status(&id("running")).is_some());
        assert!(registry.status(&id("partial")).is_some());

        // Nothing finished before a cutoff in the past
        registry.mark_finished(&id("running"), AnalysisOutcome::Succeeded);
        assert_eq!(
            registry.evict_finished_before(Utc::now() - chrono::Duration::hours(1)),
            0
        );
    }

    #[test]
    fn test_snapshot_sorted() {
        let registry = DatasetRegistry::new();
        registry.update(&id("b"), "raw");
        registry.update(&id("a"), "raw.hdr");
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].dataset_id, id("a"));
        assert_eq!(snapshot[0].received, vec!["raw.hdr".to_string()]);
        assert_eq!(snapshot[1].phase, Phase::Incomplete);
        assert_eq!(snapshot[1].missing.len(), 8);
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_value(ArrivalDecision::Waiting {
            missing: vec!["raw".to_string()],
        })
        .unwrap();
        assert_eq!(json["decision"], "waiting");
        assert_eq!(json["missing"][0], "raw");
        assert_eq!(
            serde_json::to_value(ArrivalDecision::Triggered).unwrap()["decision"],
            "triggered"
        );
    }
}
