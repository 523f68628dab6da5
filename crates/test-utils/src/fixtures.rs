//! On-disk capture fixtures.
//!
//! Writes ENVI cubes and complete capture directories laid out the way the
//! camera software produces them, so loaders and the arrival pipeline can be
//! exercised end to end.

use std::io;
use std::path::{Path, PathBuf};

use crate::generators::{blackbody_spectrum, wavelength_grid_nm};

/// Every file a complete capture directory contains.
pub const DATASET_FILES: [&str; 9] = [
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

/// Dark level written by [`DatasetFixture::uniform`].
pub const DARK_LEVEL: f64 = 100.0;

/// White minus dark level written by [`DatasetFixture::uniform`].
pub const REFERENCE_SPAN: f64 = 4000.0;

/// A cube to be written as an ENVI header plus payload.
#[derive(Debug, Clone)]
pub struct CubeFixture {
    pub rows: usize,
    pub cols: usize,
    pub wavelengths_nm: Vec<f64>,
    pub unit: String,
    /// Row-major (row, col, band) samples.
    pub data: Vec<f64>,
}

impl CubeFixture {
    pub fn bands(&self) -> usize {
        self.wavelengths_nm.len()
    }

    /// Header text with the wavelength block exactly as the camera writes it.
    pub fn header_text(&self) -> String {
        let wavelengths = self
            .wavelengths_nm
            .iter()
            .map(|w| format!("{}", w))
            .collect::<Vec<_>>()
            .join("\n,");
        format!(
            "ENVI\n\
             description = {{\nsynthetic capture}}\n\
             samples = {cols}\n\
             lines = {rows}\n\
             bands = {bands}\n\
             header offset = 0\n\
             file type = ENVI Standard\n\
             data type = 5\n\
             interleave = bip\n\
             byte order = 0\n\
             wavelength units = {unit}\n\
             wavelength = {{\n{wavelengths}\n}}\n\
             ;AOI height = {rows}\n\
             ;AOI width = {cols}\n",
            cols = self.cols,
            rows = self.rows,
            bands = self.bands(),
            unit = self.unit,
            wavelengths = wavelengths,
        )
    }

    /// Little-endian f64 payload in BIP order.
    pub fn payload(&self) -> Vec<u8> {
        self.data.iter().flat_map(|v| v.to_le_bytes()).collect()
    }
}

/// Write `<dir>/<name>.hdr` and `<dir>/<name>`.
pub fn write_envi_cube(dir: &Path, name: &str, cube: &CubeFixture) -> io::Result<()> {
    std::fs::write(dir.join(format!("{}.hdr", name)), cube.header_text())?;
    std::fs::write(dir.join(name), cube.payload())
}

/// Raw, white and dark cubes for one capture.
#[derive(Debug, Clone)]
pub struct DatasetFixture {
    pub raw: CubeFixture,
    pub white: CubeFixture,
    pub dark: CubeFixture,
}

impl DatasetFixture {
    /// A capture whose corrected spectrum at pixel (row, col) is the
    /// blackbody spectrum at `temperature(row, col)`.
    ///
    /// Temperatures that are not positive produce a pixel where white equals
    /// dark, which reference correction turns into non-finite samples.
    pub fn uniform(
        rows: usize,
        cols: usize,
        bands: usize,
        temperature: impl Fn(usize, usize) -> f64,
    ) -> Self {
        let wavelengths_nm = wavelength_grid_nm(450.0, 950.0, bands);
        let cube = |data: Vec<f64>| CubeFixture {
            rows,
            cols,
            wavelengths_nm: wavelengths_nm.clone(),
            unit: "nm".to_string(),
            data,
        };

        let mut raw = Vec::with_capacity(rows * cols * bands);
        let mut white = Vec::with_capacity(rows * cols * bands);
        let mut dark = Vec::with_capacity(rows * cols * bands);
        for row in 0..rows {
            for col in 0..cols {
                let t = temperature(row, col);
                if t > 0.0 {
                    let spectrum = blackbody_spectrum(t, &wavelengths_nm);
                    raw.extend(spectrum.iter().map(|s| DARK_LEVEL + REFERENCE_SPAN * s));
                    white.extend(std::iter::repeat(DARK_LEVEL + REFERENCE_SPAN).take(bands));
                } else {
                    raw.extend(std::iter::repeat(DARK_LEVEL * 2.0).take(bands));
                    white.extend(std::iter::repeat(DARK_LEVEL).take(bands));
                }
                dark.extend(std::iter::repeat(DARK_LEVEL).take(bands));
            }
        }

        Self {
            raw: cube(raw),
            white: cube(white),
            dark: cube(dark),
        }
    }

    /// Override the wavelength unit written to the raw header.
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.raw.unit = unit.to_string();
        self
    }

    /// Write every file of [`DATASET_FILES`] into `dir`.
    pub fn write(&self, dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(dir)?;
        write_envi_cube(dir, "raw", &self.raw)?;
        write_envi_cube(dir, "data", &self.raw)?;
        write_envi_cube(dir, "whiteReference", &self.white)?;
        write_envi_cube(dir, "darkReference", &self.dark)?;
        let frames: String = (0..self.raw.rows).map(|i| format!("{}\n", i)).collect();
        std::fs::write(dir.join("frameIndex.txt"), frames)
    }

    /// Write the capture into `<root>/<name>` and return that directory.
    pub fn write_into(&self, root: &Path, name: &str) -> io::Result<PathBuf> {
        let dir = root.join(name);
        self.write(&dir)?;
        Ok(dir)
    }
}
