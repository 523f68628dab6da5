//! ENVI reader for hyperspectral camera captures.
//!
//! A capture is stored as a plain-text `.hdr` file describing the cube
//! geometry plus a headerless binary payload. This crate provides:
//!
//! - [`EnviHeader`]: the generic `key = value` header grammar
//! - [`BandMetadata`]: the wavelength axis and its unit, extracted with the
//!   exact block markers the camera software writes
//! - [`EnviCube`]: the binary payload decoded into `f64` samples ordered
//!   (line, sample, band)
//!
//! # Example
//!
//! ```ignore
//! use envi_parser::{parse_band_metadata, EnviCube};
//!
//! let cube = EnviCube::open("capture/raw.hdr", "capture/raw")?;
//! let text = std::fs::read_to_string("capture/raw.hdr")?;
//! let bands = parse_band_metadata(&text)?;
//! assert_eq!(bands.len(), cube.bands());
//! ```

pub mod bands;
pub mod error;
pub mod header;
pub mod reader;

pub use bands::{parse_band_metadata, BandMetadata, BAND_BLOCK_END, BAND_BLOCK_START, UNITS_KEY};
pub use error::{EnviError, EnviResult};
pub use header::{ByteOrder, DataType, EnviHeader, Interleave};
pub use reader::EnviCube;
