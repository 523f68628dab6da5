//! Wavelength axis loading.

use std::path::Path;

use envi_parser::parse_band_metadata;

use crate::error::{ProcessorError, Result};
use crate::types::WavelengthAxis;

/// Read the raw header and extract its wavelength axis.
///
/// The axis must have exactly one wavelength per cube band.
pub fn load_wavelength_axis(header_path: &Path, bands: usize) -> Result<WavelengthAxis> {
    let text = std::fs::read_to_string(header_path).map_err(|e| {
        ProcessorError::data_load(format!("{}: {}", header_path.display(), e))
    })?;
    parse_wavelength_axis(&text, bands)
}

/// Extract the wavelength axis from header text.
pub fn parse_wavelength_axis(text: &str, bands: usize) -> Result<WavelengthAxis> {
    let metadata = parse_band_metadata(text).map_err(|e| ProcessorError::header_parse(e.to_string()))?;
    metadata
        .ensure_band_count(bands)
        .map_err(|e| ProcessorError::header_parse(e.to_string()))?;
    Ok(WavelengthAxis::new(metadata.wavelengths, metadata.unit))
}

/// Fail unless the axis is expressed in `expected`.
pub fn ensure_unit(axis: &WavelengthAxis, expected: &str) -> Result<()> {
    if axis.unit != expected {
        return Err(ProcessorError::UnsupportedUnit {
            found: axis.unit.clone(),
            expected: expected.to_string(),
        });
    }
    Ok(())
}
