//! Core types for cube processing.

use envi_parser::EnviCube;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};

/// Temperature recorded for a pixel whose fit failed.
pub const FAILED_PIXEL: f64 = -1.0;

/// A 3-D array of intensity samples indexed by (row, column, band).
///
/// Samples are stored row-major with the band axis innermost, so the
/// spectrum of one pixel is a contiguous slice.
#[derive(Debug, Clone, PartialEq)]
pub struct HyperspectralCube {
    rows: usize,
    cols: usize,
    bands: usize,
    data: Vec<f64>,
}

impl HyperspectralCube {
    /// Wrap row-major (row, column, band) samples.
    pub fn new(rows: usize, cols: usize, bands: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols * bands {
            return Err(ProcessorError::data_load(format!(
                "cube of {}x{}x{} needs {} samples, got {}",
                rows,
                cols,
                bands,
                rows * cols * bands,
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            bands,
            data,
        })
    }

    /// Build a cube by evaluating `f(row, col, band)` for every sample.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        bands: usize,
        mut f: impl FnMut(usize, usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(rows * cols * bands);
        for row in 0..rows {
            for col in 0..cols {
                for band in 0..bands {
                    data.push(f(row, col, band));
                }
            }
        }
        Self {
            rows,
            cols,
            bands,
            data,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// (rows, cols, bands)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.bands)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Sample at (row, col, band).
    pub fn get(&self, row: usize, col: usize, band: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols || band >= self.bands {
            return None;
        }
        Some(self.data[self.offset(row, col) + band])
    }

    /// Spectrum of one pixel.
    ///
    /// # Panics
    /// Panics if `row` or `col` is out of range.
    pub fn spectrum(&self, row: usize, col: usize) -> &[f64] {
        assert!(row < self.rows && col < self.cols, "pixel ({}, {}) out of range", row, col);
        let start = self.offset(row, col);
        &self.data[start..start + self.bands]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        (row * self.cols + col) * self.bands
    }
}

impl From<EnviCube> for HyperspectralCube {
    fn from(cube: EnviCube) -> Self {
        let (rows, cols, bands) = (cube.rows(), cube.cols(), cube.bands());
        Self {
            rows,
            cols,
            bands,
            data: cube.into_data(),
        }
    }
}

/// Wavelength of every band plus the unit label from the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WavelengthAxis {
    pub values: Vec<f64>,
    pub unit: String,
}

/// The only wavelength unit headers may declare.
pub const WAVELENGTH_UNIT: &str = "nm";

impl WavelengthAxis {
    pub fn new(values: Vec<f64>, unit: impl Into<String>) -> Self {
        Self {
            values,
            unit: unit.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Wavelengths in meters, if the unit is one we know how to convert.
    pub fn to_meters(&self) -> Option<Vec<f64>> {
        if self.unit != WAVELENGTH_UNIT {
            return None;
        }
        let factor = 1e-9;
        Some(self.values.iter().map(|v| v * factor).collect())
    }
}

/// Fitted emissivity/blackbody parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackbodyParams {
    /// Constant emissivity term.
    pub a0: f64,
    /// Linear emissivity term (per meter).
    pub a1: f64,
    /// Quadratic emissivity term (per square meter).
    pub a2: f64,
    /// Additive stray-light offset.
    pub offset: f64,
    /// Temperature in kelvin.
    pub temperature: f64,
}

impl BlackbodyParams {
    pub fn from_array(p: [f64; 5]) -> Self {
        Self {
            a0: p[0],
            a1: p[1],
            a2: p[2],
            offset: p[3],
            temperature: p[4],
        }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [self.a0, self.a1, self.a2, self.offset, self.temperature]
    }
}

/// Outcome of a successful pixel fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: BlackbodyParams,
    /// Final cost, `0.5 * sum(residual^2)`.
    pub cost: f64,
    pub iterations: usize,
}

impl FitResult {
    pub fn temperature(&self) -> f64 {
        self.params.temperature
    }
}

/// Per-pixel fit outcome: fitted parameters or the reason it failed.
pub type PixelFit = std::result::Result<FitResult, crate::error::FitError>;

/// Fitted temperature per (row, column), or the failure sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureMap {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    sentinel: f64,
}

impl TemperatureMap {
    /// Wrap row-major temperatures.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>, sentinel: f64) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(ProcessorError::data_load(format!(
                "temperature map of {}x{} needs {} values, got {}",
                rows,
                cols,
                rows * cols,
                values.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            values,
            sentinel,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Temperature at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.values[row * self.cols + col])
    }

    /// Row-major temperatures.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Whether the pixel at (row, col) holds the failure sentinel.
    pub fn is_failed(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == Some(self.sentinel)
    }

    pub fn failed_pixels(&self) -> usize {
        self.values.iter().filter(|&&v| v == self.sentinel).count()
    }

    /// Nested rows, for consumers that want `map[row][col]`.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.values.chunks(self.cols).map(<[f64]>::to_vec).collect()
    }
}
