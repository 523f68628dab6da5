//! Dataset arrival handling for hyperspectral captures.
//!
//! Files of a capture arrive one at a time, in any order and possibly more
//! than once. This crate decides when a capture is complete, runs its
//! temperature reconstruction exactly once and publishes the result.
//!
//! # Architecture
//!
//! - [`DatasetRegistry`]: which of the [`REQUIRED_FILES`] each dataset has,
//!   and whether its analysis has been claimed
//! - [`ArrivalCoordinator`]: feeds arrivals through the registry and runs
//!   the claimed analysis on the blocking pool
//! - [`ResultPublisher`]: where outcomes go; [`NpyResultPublisher`] writes
//!   `result.npy` and `result.json` per dataset
//! - [`parse_dataset_path`]: dataset id and file name from a relative path

pub mod coordinator;
pub mod error;
pub mod metadata;
pub mod npy;
pub mod publish;
pub mod registry;

// Re-exports
pub use coordinator::{ArrivalCoordinator, DatasetAnalyzer, DatasetLocator, DirectoryLocator};
pub use error::{IngestionError, Result};
pub use metadata::{parse_dataset_path, validate_dataset_id};
pub use npy::{encode_f64_2d, NpyArray};
pub use publish::{
    FailureRecord, NpyResultPublisher, ResultPublisher, ResultRecord, ERROR_FILE, RESULT_FILE,
    SUMMARY_FILE,
};
pub use registry::{
    AnalysisOutcome, ArrivalDecision, CompletionState, DatasetId, DatasetRegistry, DatasetStatus,
    Phase, REQUIRED_FILES,
};
