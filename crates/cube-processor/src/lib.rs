//! Temperature reconstruction for hyperspectral captures.
//!
//! Turns one capture directory (raw cube plus white and dark references)
//! into a 2-D map of fitted blackbody temperatures:
//!
//! - **Reference correction**: `(raw - dark) / (white - dark)` per sample
//! - **Spatial compression**: block averaging of rows and columns
//! - **Per-pixel fitting**: Levenberg-Marquardt fit of an emissivity
//!   weighted Planck curve, in parallel on a dedicated rayon pool
//!
//! # Architecture
//!
//! ```text
//! capture directory
//!      │
//!      ▼
//! ReferenceCorrectedLoader::load      raw / white / dark + frameIndex.txt
//!      │
//!      ├─► load_wavelength_axis       raw.hdr wavelength block
//!      │
//!      ▼
//! SpatialCompressor::compress         chunk_size x chunk_size blocks
//!      │
//!      ▼
//! SpectralFitter (per pixel)          failures become the sentinel
//!      │
//!      ▼
//! TemperatureMap
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cube_processor::{ProcessorConfig, ReconstructionDriver};
//!
//! let driver = ReconstructionDriver::new(ProcessorConfig::from_env()?)?;
//! let result = driver.reconstruct(Path::new("/data/capture_01"))?;
//! println!("{} of {} pixels failed", result.summary.failed_pixels, result.summary.pixels);
//! ```

pub mod bands;
pub mod calibration;
pub mod config;
pub mod downsample;
pub mod error;
pub mod fitting;
pub mod reconstruct;
pub mod types;

pub use bands::{ensure_unit, load_wavelength_axis, parse_wavelength_axis};
pub use calibration::{apply_reference_correction, DatasetPaths, ReferenceCorrectedLoader};
pub use config::ProcessorConfig;
pub use downsample::SpatialCompressor;
pub use error::{FitError, ProcessorError, Result};
pub use fitting::solver::{LeastSquaresProblem, LevenbergMarquardt, Minimum, Termination};
pub use fitting::SpectralFitter;
pub use reconstruct::{Reconstruction, ReconstructionDriver, ReconstructionSummary};
pub use types::{
    BlackbodyParams, FitResult, HyperspectralCube, PixelFit, TemperatureMap, WavelengthAxis,
    FAILED_PIXEL, WAVELENGTH_UNIT,
};
