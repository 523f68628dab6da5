//! Shared test utilities for the thermal-imaging workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic blackbody spectra with known temperatures
//! - ENVI cube and capture-directory fixtures
//! - Scratch directories
//! - Async polling for background work
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{DatasetFixture, temp_test_dir};
//!
//! let dir = temp_test_dir();
//! DatasetFixture::uniform(4, 4, 32, |_, _| 1500.0).write_into(dir.path(), "capture_01")?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;
pub mod poll;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;
pub use poll::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1500.2_f64, 1500.0_f64, 1.0_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
