//! Spatial compression of hyperspectral cubes.
//!
//! Fitting cost is linear in pixel count and every pixel needs a nonlinear
//! solve, so full-resolution captures are block-averaged first. Columns are
//! averaged in chunks of `chunk_size`, then rows, leaving the band axis
//! untouched. A trailing chunk narrower than `chunk_size` is averaged over
//! its actual width.

use crate::error::{ProcessorError, Result};
use crate::types::HyperspectralCube;

/// Reduces row and column resolution by block averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialCompressor {
    chunk_size: usize,
}

impl SpatialCompressor {
    /// Create a compressor; `chunk_size` must be positive.
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ProcessorError::config("chunk_size must be > 0"));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Output (rows, cols) for an input of the given size.
    pub fn output_dims(&self, rows: usize, cols: usize) -> (usize, usize) {
        (rows.div_ceil(self.chunk_size), cols.div_ceil(self.chunk_size))
    }

    /// Block-average both spatial axes.
    pub fn compress(&self, cube: &HyperspectralCube) -> HyperspectralCube {
        if self.chunk_size == 1 {
            return cube.clone();
        }
        let narrowed = self.average_columns(cube);
        self.average_rows(&narrowed)
    }

    fn average_columns(&self, cube: &HyperspectralCube) -> HyperspectralCube {
        let out_cols = cube.cols().div_ceil(self.chunk_size);
        HyperspectralCube::from_fn(cube.rows(), out_cols, cube.bands(), |row, chunk, band| {
            let (start, end) = self.chunk_bounds(chunk, cube.cols());
            let sum: f64 = (start..end).map(|col| cube.spectrum(row, col)[band]).sum();
            sum / (end - start) as f64
        })
    }

    fn average_rows(&self, cube: &HyperspectralCube) -> HyperspectralCube {
        let out_rows = cube.rows().div_ceil(self.chunk_size);
        HyperspectralCube::from_fn(out_rows, cube.cols(), cube.bands(), |chunk, col, band| {
            let (start, end) = self.chunk_bounds(chunk, cube.rows());
            let sum: f64 = (start..end).map(|row| cube.spectrum(row, col)[band]).sum();
            sum / (end - start) as f64
        })
    }

    #[inline]
    fn chunk_bounds(&self, chunk: usize, extent: usize) -> (usize, usize) {
        let start = chunk * self.chunk_size;
        (start, (start + self.chunk_size).min(extent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(rows: usize, cols: usize, bands: usize) -> HyperspectralCube {
        HyperspectralCube::from_fn(rows, cols, bands, |r, c, b| (r * 100 + c * 10 + b) as f64)
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            SpatialCompressor::new(0),
            Err(ProcessorError::Config(_))
        ));
    }

    #[test]
    fn test_chunk_size_one_is_identity() {
        let cube = ramp(3, 5, 2);
        let compressed = SpatialCompressor::new(1).unwrap().compress(&cube);
        assert_eq!(compressed, cube);
    }

    #[test]
    fn test_exact_multiple() {
        let cube = ramp(20, 30, 3);
        let compressed = SpatialCompressor::new(10).unwrap().compress(&cube);
        assert_eq!(compressed.shape(), (2, 3, 3));

        // Block rows 0..10, cols 10..20: mean row 4.5, mean col 14.5.
        let expected = 4.5 * 100.0 + 14.5 * 10.0 + 2.0;
        assert!((compressed.get(0, 1, 2).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_chunk_averaged_over_actual_width() {
        let cube = ramp(5, 7, 1);
        let compressor = SpatialCompressor::new(3).unwrap();
        assert_eq!(compressor.output_dims(5, 7), (2, 3));

        let compressed = compressor.compress(&cube);
        assert_eq!(compressed.shape(), (2, 3, 1));

        // Last block: rows 3..5 (mean 3.5), cols 6..7 (mean 6).
        let expected = 3.5 * 100.0 + 6.0 * 10.0;
        assert!((compressed.get(1, 2, 0).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_chunk_larger_than_cube() {
        let cube = ramp(2, 2, 1);
        let compressed = SpatialCompressor::new(10).unwrap().compress(&cube);
        assert_eq!(compressed.shape(), (1, 1, 1));
        assert!((compressed.get(0, 0, 0).unwrap() - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_propagates() {
        let cube = HyperspectralCube::from_fn(2, 2, 1, |r, c, _| {
            if r == 1 && c == 1 {
                f64::INFINITY
            } else {
                1.0
            }
        });
        let compressed = SpatialCompressor::new(2).unwrap().compress(&cube);
        assert!(compressed.get(0, 0, 0).unwrap().is_infinite());
    }
}
