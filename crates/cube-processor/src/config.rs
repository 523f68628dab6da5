//! Configuration for the cube processor.

use serde::{Deserialize, Serialize};

use crate::error::{ProcessorError, Result};

/// Configuration for reconstruction and fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Block size used to average rows and columns before fitting.
    pub chunk_size: usize,

    /// Fitting threads. 0 uses one per available core.
    pub worker_threads: usize,

    /// Upper bound on Levenberg-Marquardt iterations per pixel.
    pub max_iterations: usize,

    /// Relative cost reduction below which a fit is converged.
    pub ftol: f64,

    /// Relative step size below which a fit is converged.
    pub xtol: f64,

    /// Scaled gradient norm below which a fit is converged.
    pub gtol: f64,

    /// Seed for every pixel fit: `[a0, a1, a2, offset, T]`.
    pub initial_guess: [f64; 5],

    /// Temperature written for pixels whose fit failed.
    pub failure_sentinel: f64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            worker_threads: 0,
            max_iterations: 1000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            initial_guess: [1.0, 1.0, 1.0, 0.1, 1000.0],
            failure_sentinel: -1.0,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; set but malformed variables are
    /// a configuration error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(size) = env_number("SPATIAL_CHUNK_SIZE")? {
            config.chunk_size = size;
        }

        if let Some(threads) = env_number("FIT_WORKER_THREADS")? {
            config.worker_threads = threads;
        }

        if let Some(iterations) = env_number("FIT_MAX_ITERATIONS")? {
            config.max_iterations = iterations;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ProcessorError::config("chunk_size must be > 0"));
        }

        if self.max_iterations == 0 {
            return Err(ProcessorError::config("max_iterations must be > 0"));
        }

        for (name, tol) in [("ftol", self.ftol), ("xtol", self.xtol), ("gtol", self.gtol)] {
            if !tol.is_finite() || tol < 0.0 {
                return Err(ProcessorError::config(format!(
                    "{} must be a finite non-negative number",
                    name
                )));
            }
        }

        if self.initial_guess.iter().any(|v| !v.is_finite()) {
            return Err(ProcessorError::config("initial_guess must be finite"));
        }

        Ok(())
    }
}

fn env_number(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ProcessorError::config(format!("{} must be a non-negative integer, got '{}'", key, val))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProcessorConfig::default();
        assert_eq!(config.chunk_size, 10);
        assert_eq!(config.initial_guess, [1.0, 1.0, 1.0, 0.1, 1000.0]);
        assert_eq!(config.failure_sentinel, -1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ProcessorConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProcessorError::Config(_))));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = ProcessorConfig {
            ftol: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ProcessorError::Config(_))));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: ProcessorConfig = serde_json::from_str(r#"{"chunk_size": 4}"#).unwrap();
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.max_iterations, 1000);
    }
}
