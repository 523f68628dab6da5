//! Wavelength axis extraction.
//!
//! The camera software writes the wavelength list in a fixed layout:
//!
//! ```text
//! wavelength units = nm
//! wavelength = {
//! 397.32
//! ,400.20
//! }
//! ;AOI height = 512
//! ```
//!
//! Existing capture archives depend on this exact byte layout, so the
//! markers below are matched literally rather than through the generic
//! header grammar.

use tracing::debug;

use crate::error::{EnviError, EnviResult};

/// Marker that opens the wavelength block.
pub const BAND_BLOCK_START: &str = "\nwavelength = {\n";

/// Marker that closes the wavelength block.
pub const BAND_BLOCK_END: &str = "\n}\n;AOI height";

/// Separator between consecutive wavelength values.
pub const BAND_SEPARATOR: &str = "\n,";

/// Key that introduces the wavelength unit.
pub const UNITS_KEY: &str = "wavelength units = ";

/// Per-band wavelengths and their unit label.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMetadata {
    /// Wavelength of each band, in header order.
    pub wavelengths: Vec<f64>,
    /// Unit label exactly as written in the header.
    pub unit: String,
}

impl BandMetadata {
    /// Number of bands described.
    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Check the wavelength count against a cube's band dimension.
    pub fn ensure_band_count(&self, bands: usize) -> EnviResult<()> {
        if self.wavelengths.len() != bands {
            return Err(EnviError::header(format!(
                "header lists {} wavelengths but cube has {} bands",
                self.wavelengths.len(),
                bands
            )));
        }
        Ok(())
    }
}

/// Extract the wavelength list and unit from raw header text.
pub fn parse_band_metadata(text: &str) -> EnviResult<BandMetadata> {
    let block_marker = text
        .find(BAND_BLOCK_START)
        .ok_or_else(|| EnviError::header("wavelength block start marker not found"))?;
    let block_start = block_marker + BAND_BLOCK_START.len();

    let block_end = text
        .find(BAND_BLOCK_END)
        .ok_or_else(|| EnviError::header("wavelength block end marker not found"))?;
    if block_end < block_start {
        return Err(EnviError::header("wavelength block end precedes its start"));
    }

    let wavelengths = text[block_start..block_end]
        .split(BAND_SEPARATOR)
        .map(|value| {
            value.trim().parse::<f64>().map_err(|_| {
                EnviError::header(format!("invalid wavelength value '{}'", value.trim()))
            })
        })
        .collect::<EnviResult<Vec<f64>>>()?;

    let units_start = text
        .find(UNITS_KEY)
        .ok_or_else(|| EnviError::header("wavelength units key not found"))?
        + UNITS_KEY.len();
    if units_start > block_marker {
        return Err(EnviError::header(
            "wavelength units key must precede the wavelength block",
        ));
    }
    let unit = text[units_start..block_marker].to_string();

    debug!(bands = wavelengths.len(), unit = %unit, "Parsed wavelength axis");

    Ok(BandMetadata { wavelengths, unit })
}
