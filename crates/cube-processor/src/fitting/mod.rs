//! Per-pixel blackbody fitting.
//!
//! Each pixel spectrum is fitted independently against the emissivity
//! weighted Planck model in [`blackbody`] using the Levenberg-Marquardt
//! solver in [`solver`]. Failures are reported per pixel and never abort
//! the surrounding reconstruction.

pub mod blackbody;
pub mod solver;

use nalgebra::DVector;

use crate::config::ProcessorConfig;
use crate::error::FitError;
use crate::types::{BlackbodyParams, FitResult, PixelFit, WavelengthAxis};

use blackbody::BlackbodyProblem;
use solver::LevenbergMarquardt;

/// Fits the blackbody model to single spectra.
#[derive(Debug, Clone)]
pub struct SpectralFitter {
    initial_guess: [f64; 5],
    solver: LevenbergMarquardt,
}

impl Default for SpectralFitter {
    fn default() -> Self {
        Self::new(&ProcessorConfig::default())
    }
}

impl SpectralFitter {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            initial_guess: config.initial_guess,
            solver: LevenbergMarquardt {
                max_iterations: config.max_iterations,
                ftol: config.ftol,
                xtol: config.xtol,
                gtol: config.gtol,
                ..Default::default()
            },
        }
    }

    pub fn initial_guess(&self) -> [f64; 5] {
        self.initial_guess
    }

    /// Fit one spectrum sampled on `axis`.
    pub fn fit(&self, spectrum: &[f64], axis: &WavelengthAxis) -> PixelFit {
        let meters = axis
            .to_meters()
            .ok_or_else(|| FitError::UnsupportedUnit(axis.unit.clone()))?;
        self.fit_meters(spectrum, &meters)
    }

    /// Fit one spectrum sampled at `wavelengths` given in meters.
    pub fn fit_meters(&self, spectrum: &[f64], wavelengths: &[f64]) -> PixelFit {
        if spectrum.len() != wavelengths.len() {
            return Err(FitError::LengthMismatch {
                spectrum: spectrum.len(),
                wavelengths: wavelengths.len(),
            });
        }
        if let Some(band) = spectrum.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteSamples { band });
        }

        let problem = BlackbodyProblem::new(wavelengths, spectrum);
        let minimum = self
            .solver
            .minimize(&problem, DVector::from_row_slice(&self.initial_guess))?;

        if minimum.params.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteParameters);
        }

        let p = &minimum.params;
        Ok(FitResult {
            params: BlackbodyParams::from_array([p[0], p[1], p[2], p[3], p[4]]),
            cost: minimum.cost,
            iterations: minimum.iterations,
        })
    }
}
