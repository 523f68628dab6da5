//! Planck radiation with a wavelength-dependent emissivity.
//!
//! ```text
//! e(l)         = a0 + a1*l + a2*l^2
//! intensity(l) = e(l) * (2*h*c^2 / l^5) / (exp(h*c / (l*k*T)) - 1) + offset
//! ```
//!
//! Wavelengths are in meters, temperature in kelvin.

use nalgebra::{DMatrix, DVector};

use super::solver::LeastSquaresProblem;

/// Planck constant, J*s.
pub const PLANCK: f64 = 6.62607015e-34;

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Boltzmann constant, J/K.
pub const BOLTZMANN: f64 = 1.380649e-23;

/// Blackbody spectral radiance at wavelength `l` (m) and temperature `t` (K).
#[inline]
pub fn spectral_radiance(l: f64, t: f64) -> f64 {
    let x = PLANCK * SPEED_OF_LIGHT / (l * BOLTZMANN * t);
    2.0 * PLANCK * SPEED_OF_LIGHT * SPEED_OF_LIGHT / l.powi(5) / x.exp_m1()
}

/// Emissivity polynomial at wavelength `l`.
#[inline]
pub fn emissivity(p: &[f64; 5], l: f64) -> f64 {
    p[0] + p[1] * l + p[2] * l * l
}

/// Model intensity for parameters `[a0, a1, a2, offset, T]`.
#[inline]
pub fn intensity(p: &[f64; 5], l: f64) -> f64 {
    emissivity(p, l) * spectral_radiance(l, p[4]) + p[3]
}

/// Least-squares problem for one pixel spectrum.
pub struct BlackbodyProblem<'a> {
    wavelengths: &'a [f64],
    observed: &'a [f64],
}

impl<'a> BlackbodyProblem<'a> {
    /// `wavelengths` in meters, one per observed sample.
    pub fn new(wavelengths: &'a [f64], observed: &'a [f64]) -> Self {
        debug_assert_eq!(wavelengths.len(), observed.len());
        Self {
            wavelengths,
            observed,
        }
    }
}

#[inline]
fn params_array(p: &DVector<f64>) -> [f64; 5] {
    [p[0], p[1], p[2], p[3], p[4]]
}

impl LeastSquaresProblem for BlackbodyProblem<'_> {
    fn parameter_count(&self) -> usize {
        5
    }

    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let p = params_array(params);
        DVector::from_iterator(
            self.observed.len(),
            self.wavelengths
                .iter()
                .zip(self.observed)
                .map(|(&l, &y)| intensity(&p, l) - y),
        )
    }

    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let p = params_array(params);
        let t = p[4];
        let mut jac = DMatrix::zeros(self.wavelengths.len(), 5);

        for (i, &l) in self.wavelengths.iter().enumerate() {
            let x = PLANCK * SPEED_OF_LIGHT / (l * BOLTZMANN * t);
            let em1 = x.exp_m1();
            let radiance = 2.0 * PLANCK * SPEED_OF_LIGHT * SPEED_OF_LIGHT / l.powi(5) / em1;
            // d/dT of 1/(e^x - 1) with x ~ 1/T
            let d_radiance_dt = radiance * x * (1.0 + 1.0 / em1) / t;

            jac[(i, 0)] = radiance;
            jac[(i, 1)] = l * radiance;
            jac[(i, 2)] = l * l * radiance;
            jac[(i, 3)] = 1.0;
            jac[(i, 4)] = emissivity(&p, l) * d_radiance_dt;
        }

        jac
    }
}
