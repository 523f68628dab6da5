//! Dark/white reference correction.
//!
//! Every capture ships with a dark reference (shutter closed) and a white
//! reference (calibration target). Raw counts are normalized per sample as
//! `(raw - dark) / (white - dark)`. A degenerate reference (`white == dark`)
//! yields non-finite values, which are left in place for the fitter to
//! reject pixel by pixel.

use std::path::{Path, PathBuf};

use envi_parser::EnviCube;
use tracing::{debug, info};

use crate::error::{ProcessorError, Result};
use crate::types::HyperspectralCube;

/// Locations of the files that make up one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub raw_header: PathBuf,
    pub raw: PathBuf,
    pub white_header: PathBuf,
    pub white: PathBuf,
    pub dark_header: PathBuf,
    pub dark: PathBuf,
    pub frame_index: PathBuf,
}

impl DatasetPaths {
    /// Derive every path from the capture directory.
    pub fn from_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            raw_header: root.join("raw.hdr"),
            raw: root.join("raw"),
            white_header: root.join("whiteReference.hdr"),
            white: root.join("whiteReference"),
            dark_header: root.join("darkReference.hdr"),
            dark: root.join("darkReference"),
            frame_index: root.join("frameIndex.txt"),
        }
    }
}

/// Loads a capture and applies reference correction.
pub struct ReferenceCorrectedLoader;

impl ReferenceCorrectedLoader {
    /// Read the raw, white and dark cubes and return the corrected cube.
    pub fn load(paths: &DatasetPaths) -> Result<HyperspectralCube> {
        // Unused by the correction, but its absence means the capture is incomplete.
        std::fs::File::open(&paths.frame_index).map_err(|e| {
            ProcessorError::data_load(format!(
                "frame index {} is unreadable: {}",
                paths.frame_index.display(),
                e
            ))
        })?;

        let raw = open_cube(&paths.raw_header, &paths.raw)?;
        let white = open_cube(&paths.white_header, &paths.white)?;
        let dark = open_cube(&paths.dark_header, &paths.dark)?;

        info!(
            rows = raw.rows(),
            cols = raw.cols(),
            bands = raw.bands(),
            white_rows = white.rows(),
            dark_rows = dark.rows(),
            "Loaded capture cubes"
        );

        apply_reference_correction(&raw, &white, &dark)
    }
}

fn open_cube(header: &Path, data: &Path) -> Result<HyperspectralCube> {
    EnviCube::open(header, data)
        .map(HyperspectralCube::from)
        .map_err(|e| ProcessorError::data_load(format!("{}: {}", data.display(), e)))
}

/// Normalize `raw` against the dark and white references.
///
/// References must share the raw cube's columns and bands, and either have
/// the same number of rows or a single row that applies to every raw row.
pub fn apply_reference_correction(
    raw: &HyperspectralCube,
    white: &HyperspectralCube,
    dark: &HyperspectralCube,
) -> Result<HyperspectralCube> {
    check_reference("white reference", raw, white)?;
    check_reference("dark reference", raw, dark)?;

    let corrected = HyperspectralCube::from_fn(raw.rows(), raw.cols(), raw.bands(), |r, c, b| {
        let raw_value = raw.spectrum(r, c)[b];
        let white_value = white.spectrum(reference_row(white, r), c)[b];
        let dark_value = dark.spectrum(reference_row(dark, r), c)[b];
        (raw_value - dark_value) / (white_value - dark_value)
    });

    let non_finite = corrected.data().iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        debug!(non_finite, "Reference correction produced non-finite samples");
    }

    Ok(corrected)
}

#[inline]
fn reference_row(reference: &HyperspectralCube, row: usize) -> usize {
    if reference.rows() == 1 {
        0
    } else {
        row
    }
}

fn check_reference(
    name: &str,
    raw: &HyperspectralCube,
    reference: &HyperspectralCube,
) -> Result<()> {
    let rows_ok = reference.rows() == raw.rows() || reference.rows() == 1;
    if !rows_ok || reference.cols() != raw.cols() || reference.bands() != raw.bands() {
        return Err(ProcessorError::data_load(format!(
            "{} shape {:?} is incompatible with raw shape {:?}",
            name,
            reference.shape(),
            raw.shape()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(rows: usize, f: impl Fn(usize, usize, usize) -> f64) -> HyperspectralCube {
        HyperspectralCube::from_fn(rows, 3, 4, f)
    }

    #[test]
    fn test_raw_equal_dark_is_zero() {
        let dark = cube(2, |r, c, b| (r + c + b) as f64);
        let white = cube(2, |r, c, b| (r + c + b) as f64 + 50.0);
        let corrected = apply_reference_correction(&dark, &white, &dark).unwrap();
        assert!(corrected.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_degenerate_reference_is_non_finite() {
        let raw = cube(2, |_, _, _| 30.0);
        let dark = cube(2, |_, _, _| 10.0);
        let corrected = apply_reference_correction(&raw, &dark, &dark).unwrap();
        assert!(corrected.data().iter().all(|v| v.is_infinite()));

        // 0 / 0
        let corrected = apply_reference_correction(&dark, &dark, &dark).unwrap();
        assert!(corrected.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_correction_formula() {
        let raw = cube(2, |_, _, b| 10.0 + 10.0 * b as f64);
        let white = cube(2, |_, _, _| 110.0);
        let dark = cube(2, |_, _, _| 10.0);
        let corrected = apply_reference_correction(&raw, &white, &dark).unwrap();
        assert_eq!(corrected.spectrum(1, 2), &[0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_single_row_reference_broadcasts() {
        let raw = cube(3, |r, _, _| 10.0 + r as f64 * 25.0);
        let white = cube(1, |_, _, _| 110.0);
        let dark = cube(1, |_, _, _| 10.0);
        let corrected = apply_reference_correction(&raw, &white, &dark).unwrap();
        assert_eq!(corrected.get(0, 0, 0), Some(0.0));
        assert_eq!(corrected.get(2, 1, 3), Some(0.5));
    }

    #[test]
    fn test_inconsistent_shapes_fail() {
        let raw = cube(3, |_, _, _| 1.0);
        let white = cube(2, |_, _, _| 2.0);
        let dark = cube(3, |_, _, _| 0.0);
        assert!(matches!(
            apply_reference_correction(&raw, &white, &dark),
            Err(ProcessorError::DataLoad(_))
        ));

        let narrow = HyperspectralCube::from_fn(3, 2, 4, |_, _, _| 0.0);
        assert!(matches!(
            apply_reference_correction(&raw, &cube(3, |_, _, _| 2.0), &narrow),
            Err(ProcessorError::DataLoad(_))
        ));
    }

    #[test]
    fn test_dataset_paths() {
        let paths = DatasetPaths::from_root("/data/capture_01");
        assert_eq!(paths.raw_header, PathBuf::from("/data/capture_01/raw.hdr"));
        assert_eq!(paths.white, PathBuf::from("/data/capture_01/whiteReference"));
        assert_eq!(paths.frame_index, PathBuf::from("/data/capture_01/frameIndex.txt"));
    }
}
