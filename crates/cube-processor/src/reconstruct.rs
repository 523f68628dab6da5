//! Dataset-level temperature reconstruction.
//!
//! Ties the stages together for one capture directory:
//! load and reference-correct the cubes, read the wavelength axis,
//! block-average spatially, then fit every remaining pixel in parallel.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bands::{ensure_unit, load_wavelength_axis};
use crate::calibration::{DatasetPaths, ReferenceCorrectedLoader};
use crate::config::ProcessorConfig;
use crate::downsample::SpatialCompressor;
use crate::error::{ProcessorError, Result};
use crate::fitting::SpectralFitter;
use crate::types::{HyperspectralCube, TemperatureMap, WavelengthAxis, WAVELENGTH_UNIT};

/// Statistics for one reconstruction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionSummary {
    /// Pixels fitted after compression.
    pub pixels: usize,
    pub failed_pixels: usize,
    pub bands: usize,
    /// (rows, cols) before compression.
    pub original_dims: (usize, usize),
    /// (rows, cols) after compression.
    pub compressed_dims: (usize, usize),
    pub chunk_size: usize,
    pub elapsed_ms: u64,
}

/// Output of [`ReconstructionDriver::reconstruct`].
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub map: TemperatureMap,
    pub summary: ReconstructionSummary,
}

/// Runs the full pipeline on capture directories.
///
/// Owns a dedicated worker pool so concurrent reconstructions do not
/// compete with other rayon users in the process.
pub struct ReconstructionDriver {
    config: ProcessorConfig,
    compressor: SpatialCompressor,
    fitter: SpectralFitter,
    pool: ThreadPool,
}

impl ReconstructionDriver {
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        let compressor = SpatialCompressor::new(config.chunk_size)?;
        let fitter = SpectralFitter::new(&config);
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("fit-worker-{}", i))
            .build()
            .map_err(|e| ProcessorError::Worker(e.to_string()))?;

        info!(
            chunk_size = config.chunk_size,
            workers = pool.current_num_threads(),
            "Reconstruction driver ready"
        );

        Ok(Self {
            config,
            compressor,
            fitter,
            pool,
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Reconstruct the temperature map of the capture rooted at `root`.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn reconstruct(&self, root: &Path) -> Result<Reconstruction> {
        let started = Instant::now();
        let paths = DatasetPaths::from_root(root);

        let cube = ReferenceCorrectedLoader::load(&paths)?;
        let axis = load_wavelength_axis(&paths.raw_header, cube.bands())?;
        ensure_unit(&axis, WAVELENGTH_UNIT)?;

        let compressed = self.compressor.compress(&cube);
        debug!(
            from = ?(cube.rows(), cube.cols()),
            to = ?(compressed.rows(), compressed.cols()),
            "Compressed cube"
        );

        let map = self.fit_cube(&compressed, &axis)?;

        let summary = ReconstructionSummary {
            pixels: compressed.pixel_count(),
            failed_pixels: map.failed_pixels(),
            bands: cube.bands(),
            original_dims: (cube.rows(), cube.cols()),
            compressed_dims: (compressed.rows(), compressed.cols()),
            chunk_size: self.compressor.chunk_size(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if summary.failed_pixels > 0 {
            warn!(
                failed = summary.failed_pixels,
                pixels = summary.pixels,
                "Some pixels could not be fitted"
            );
        }
        info!(
            pixels = summary.pixels,
            failed = summary.failed_pixels,
            elapsed_ms = summary.elapsed_ms,
            "Reconstruction complete"
        );

        Ok(Reconstruction { map, summary })
    }

    /// Fit every pixel of an already corrected and compressed cube.
    ///
    /// Pixels whose fit fails hold the configured sentinel.
    pub fn fit_cube(
        &self,
        cube: &HyperspectralCube,
        axis: &WavelengthAxis,
    ) -> Result<TemperatureMap> {
        if axis.len() != cube.bands() {
            return Err(ProcessorError::header_parse(format!(
                "{} wavelengths for {} bands",
                axis.len(),
                cube.bands()
            )));
        }
        let wavelengths = axis.to_meters().ok_or_else(|| ProcessorError::UnsupportedUnit {
            found: axis.unit.clone(),
            expected: WAVELENGTH_UNIT.to_string(),
        })?;

        let cols = cube.cols();
        let sentinel = self.config.failure_sentinel;

        let values: Vec<f64> = self.pool.install(|| {
            (0..cube.pixel_count())
                .into_par_iter()
                .map(|index| {
                    let (row, col) = (index / cols, index % cols);
                    match self.fitter.fit_meters(cube.spectrum(row, col), &wavelengths) {
                        Ok(fit) => fit.temperature(),
                        Err(e) => {
                            debug!(row, col, error = %e, "Pixel fit failed");
                            sentinel
                        }
                    }
                })
                .collect()
        });

        TemperatureMap::from_values(cube.rows(), cols, values, sentinel)
    }
}
