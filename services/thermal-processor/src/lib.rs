//! Thermal processor service library.
//!
//! Watches a data directory for hyperspectral captures, waits until each one
//! is complete, reconstructs its temperature map and writes the result.
//! The binary in `main.rs` wires these modules together; they are exposed
//! here for testing.

pub mod config;
pub mod oneshot;
pub mod scan;
pub mod server;
pub mod state;

pub use config::{ConfigOverrides, ServiceConfig};
pub use oneshot::analyze_once;
pub use scan::{evict_once, scan_existing, spawn_eviction, ScanReport};
pub use server::{build_router, start_server};
pub use state::{build_coordinator, AppState};
