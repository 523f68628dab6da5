//! Error types for cube processing.

use thiserror::Error;

/// Dataset-level errors. Any of these aborts the reconstruction of the
/// current dataset only.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Invalid static configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A referenced file is unreadable or the cubes disagree on geometry.
    #[error("failed to load data: {0}")]
    DataLoad(String),

    /// The wavelength block could not be extracted or does not match the cube.
    #[error("failed to parse header: {0}")]
    HeaderParse(String),

    /// The wavelength axis is not expressed in the expected unit.
    #[error("unsupported wavelength unit '{found}', expected '{expected}'")]
    UnsupportedUnit { found: String, expected: String },

    /// The fitting worker pool could not be created.
    #[error("worker pool error: {0}")]
    Worker(String),
}

impl ProcessorError {
    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a DataLoad error.
    pub fn data_load(msg: impl Into<String>) -> Self {
        Self::DataLoad(msg.into())
    }

    /// Create a HeaderParse error.
    pub fn header_parse(msg: impl Into<String>) -> Self {
        Self::HeaderParse(msg.into())
    }
}

impl From<std::io::Error> for ProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::DataLoad(err.to_string())
    }
}

/// Why a single pixel could not be fitted.
///
/// Never escalated: the driver records the failure sentinel and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("spectrum has {spectrum} samples but {wavelengths} wavelengths were given")]
    LengthMismatch { spectrum: usize, wavelengths: usize },

    #[error("wavelength unit '{0}' cannot be converted to meters")]
    UnsupportedUnit(String),

    #[error("non-finite sample in band {band}")]
    NonFiniteSamples { band: usize },

    #[error("residuals are not finite at the initial guess")]
    NonFiniteResiduals,

    #[error("jacobian is not finite")]
    NonFiniteJacobian,

    #[error("damped normal equations could not be factorized")]
    SingularSystem,

    #[error("no convergence after {0} iterations")]
    MaxIterations(usize),

    #[error("fitted parameters are not finite")]
    NonFiniteParameters,
}

/// Result type for cube processing operations.
pub type Result<T> = std::result::Result<T, ProcessorError>;
