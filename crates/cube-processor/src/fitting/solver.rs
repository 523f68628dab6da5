//! Levenberg-Marquardt nonlinear least squares.
//!
//! Minimizes `0.5 * |r(p)|^2` for any [`LeastSquaresProblem`] that supplies
//! residuals and an analytic Jacobian. Damping is scaled by the running
//! maximum of `diag(J^T J)` (Marquardt scaling), which keeps the iteration
//! independent of the units of each parameter. That matters for the
//! blackbody model, whose parameters span some twenty orders of magnitude.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Damping beyond which no downhill step can be found.
const MAX_LAMBDA: f64 = 1e32;

/// Minimum gain ratio for a trial step to be accepted.
const ACCEPT_RATIO: f64 = 1e-4;

/// A residual function with its Jacobian.
pub trait LeastSquaresProblem {
    fn parameter_count(&self) -> usize;

    /// Residual vector at `params`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian of the residuals at `params`, one row per residual.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

/// Why the solver stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Residuals are exactly zero.
    ExactFit,
    /// Scaled gradient fell below `gtol`.
    SmallGradient,
    /// Relative cost reduction fell below `ftol`.
    SmallCostReduction,
    /// Scaled step fell below `xtol`.
    SmallStep,
    /// No damping level produced a downhill step.
    NoFurtherReduction,
}

/// Solution found by the solver.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub params: DVector<f64>,
    /// `0.5 * |r|^2` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub termination: Termination,
}

/// Solver settings.
#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub initial_lambda: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-12,
            xtol: 1e-12,
            gtol: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

impl LevenbergMarquardt {
    /// Minimize `problem` starting from `initial`.
    pub fn minimize<P: LeastSquaresProblem>(
        &self,
        problem: &P,
        initial: DVector<f64>,
    ) -> Result<Minimum, FitError> {
        let n = problem.parameter_count();
        let mut params = initial;

        let mut residuals = problem.residuals(&params);
        if !all_finite(residuals.as_slice()) {
            return Err(FitError::NonFiniteResiduals);
        }
        let mut cost = 0.5 * residuals.norm_squared();
        let mut jacobian = checked_jacobian(problem, &params)?;

        let mut lambda = self.initial_lambda;
        let mut scale = DVector::<f64>::zeros(n);

        for iteration in 0..self.max_iterations {
            let jt = jacobian.transpose();
            let normal = &jt * &jacobian;
            let gradient = &jt * &residuals;

            for i in 0..n {
                scale[i] = scale[i].max(normal[(i, i)]);
            }
            let diag = scale.map(|d| if d > 0.0 { d } else { 1.0 });
            let diag_sqrt = diag.map(f64::sqrt);

            if cost == 0.0 {
                return Ok(Minimum {
                    params,
                    cost,
                    iterations: iteration,
                    termination: Termination::ExactFit,
                });
            }

            let scaled_gradient = gradient
                .iter()
                .zip(diag_sqrt.iter())
                .map(|(g, d)| g.abs() / d)
                .fold(0.0, f64::max);
            if scaled_gradient <= self.gtol * (2.0 * cost).sqrt() {
                return Ok(Minimum {
                    params,
                    cost,
                    iterations: iteration,
                    termination: Termination::SmallGradient,
                });
            }

            loop {
                let mut damped = normal.clone();
                for i in 0..n {
                    damped[(i, i)] += lambda * diag[i];
                }

                let Some(cholesky) = damped.cholesky() else {
                    lambda *= 10.0;
                    if lambda > MAX_LAMBDA {
                        return Err(FitError::SingularSystem);
                    }
                    continue;
                };
                let step = cholesky.solve(&(-&gradient));
                let trial = &params + &step;
                let trial_residuals = problem.residuals(&trial);

                let (trial_cost, ratio) = if all_finite(trial_residuals.as_slice()) {
                    let trial_cost = 0.5 * trial_residuals.norm_squared();
                    let predicted =
                        0.5 * step.dot(&(step.component_mul(&diag) * lambda - &gradient));
                    let ratio = if predicted > 0.0 {
                        (cost - trial_cost) / predicted
                    } else {
                        -1.0
                    };
                    (trial_cost, ratio)
                } else {
                    (f64::INFINITY, -1.0)
                };

                if ratio > ACCEPT_RATIO {
                    let step_norm = step.component_mul(&diag_sqrt).norm();
                    let param_norm = params.component_mul(&diag_sqrt).norm();
                    let small_reduction = cost - trial_cost <= self.ftol * cost;
                    let small_step = step_norm <= self.xtol * (param_norm + self.xtol);

                    params = trial;
                    residuals = trial_residuals;
                    cost = trial_cost;
                    jacobian = checked_jacobian(problem, &params)?;
                    lambda *= (1.0f64 / 3.0).max(1.0 - (2.0 * ratio - 1.0).powi(3));

                    if small_reduction || small_step {
                        let termination = if small_reduction {
                            Termination::SmallCostReduction
                        } else {
                            Termination::SmallStep
                        };
                        return Ok(Minimum {
                            params,
                            cost,
                            iterations: iteration + 1,
                            termination,
                        });
                    }
                    break;
                }

                lambda *= 2.0;
                if lambda > MAX_LAMBDA {
                    return Ok(Minimum {
                        params,
                        cost,
                        iterations: iteration + 1,
                        termination: Termination::NoFurtherReduction,
                    });
                }
            }
        }

        Err(FitError::MaxIterations(self.max_iterations))
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

fn checked_jacobian<P: LeastSquaresProblem>(
    problem: &P,
    params: &DVector<f64>,
) -> Result<DMatrix<f64>, FitError> {
    let jacobian = problem.jacobian(params);
    if !all_finite(jacobian.as_slice()) {
        return Err(FitError::NonFiniteJacobian);
    }
    Ok(jacobian)
}
