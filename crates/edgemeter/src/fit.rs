//! Smoothed-step model fit to the edge spread function.
//!
//! Model: `f(x) = a1 · erf((x - a3) / (σ√2)) + a2`, fitted by damped
//! Gauss-Newton (Levenberg-Marquardt) with an explicit iteration cap.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use crate::esf::EdgeSpreadFunction;

/// Errors from the edge-model fit.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer distinct bins than model parameters.
    TooFewBins {
        /// Required minimum number of bins.
        needed: usize,
        /// Provided number of bins.
        got: usize,
    },
    /// Iteration cap reached before any convergence test passed.
    DidNotConverge {
        /// Iterations spent.
        iterations: usize,
    },
    /// Initial residuals or the final parameters are not finite.
    NonFinite,
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewBins { needed, got } => {
                write!(f, "too few ESF bins: need {}, got {}", needed, got)
            }
            Self::DidNotConverge { iterations } => {
                write!(f, "fit did not converge after {} iterations", iterations)
            }
            Self::NonFinite => write!(f, "fit produced non-finite values"),
        }
    }
}

impl std::error::Error for FitError {}

/// Solver controls and initial guesses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Maximum LM iterations (accepted or rejected steps).
    pub max_iters: usize,
    /// Relative cost-reduction tolerance.
    pub ftol: f64,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Gradient infinity-norm tolerance.
    pub gtol: f64,
    /// Initial σ guess in pixels.
    pub initial_sigma: f64,
    /// Initial baseline (`a2`) guess.
    pub initial_baseline: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 5e-5,
            xtol: 5e-5,
            gtol: 1e-10,
            initial_sigma: 10.0,
            initial_baseline: 10.0,
        }
    }
}

/// Fitted model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// `a1`: half the step height (signed).
    pub amplitude: f64,
    /// `a3`: edge position along the distance axis.
    pub center_offset: f64,
    /// `σ`: transition width. May come out negative; use [`FitResult::blurriness`].
    pub sigma: f64,
    /// `a2`: mid-level of the step.
    pub baseline: f64,
    /// Iterations spent.
    pub iterations: usize,
    /// Final `0.5 · Σ r²`.
    pub cost: f64,
}

impl FitResult {
    /// `|σ|`.
    pub fn blurriness(&self) -> f64 {
        self.sigma.abs()
    }

    /// Model value at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        edge_model(
            x,
            &Vector4::new(self.amplitude, self.center_offset, self.sigma, self.baseline),
        )
    }
}

/// Error function, |ε| < 1.2e-7 (Numerical Recipes `erfc` Chebyshev fit).
pub fn erf(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let erfc = t * poly.exp();
    if x >= 0.0 {
        1.0 - erfc
    } else {
        erfc - 1.0
    }
}

const FRAC_2_SQRT_PI: f64 = std::f64::consts::FRAC_2_SQRT_PI;
const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// Parameter order: `[a1, a3, σ, a2]`.
#[inline]
fn edge_model(x: f64, p: &Vector4<f64>) -> f64 {
    p[0] * erf((x - p[1]) / (p[2] * SQRT_2)) + p[3]
}

/// Gradient of the model with respect to `[a1, a3, σ, a2]`.
#[inline]
fn edge_model_grad(x: f64, p: &Vector4<f64>) -> Vector4<f64> {
    let s = p[2] * SQRT_2;
    let z = (x - p[1]) / s;
    let g = FRAC_2_SQRT_PI * (-z * z).exp();
    Vector4::new(erf(z), -p[0] * g / s, -p[0] * g * z / p[2], 1.0)
}

fn cost_at(xs: &[f64], ys: &[f64], p: &Vector4<f64>) -> f64 {
    0.5 * xs
        .iter()
        .zip(ys)
        .map(|(&x, &y)| {
            let r = y - edge_model(x, p);
            r * r
        })
        .sum::<f64>()
}

/// Normal-equation terms `(cost, JᵀJ, Jᵀr)` at `p`, with `r = y - f`.
fn linearize(xs: &[f64], ys: &[f64], p: &Vector4<f64>) -> (f64, Matrix4<f64>, Vector4<f64>) {
    let mut jtj = Matrix4::<f64>::zeros();
    let mut jtr = Vector4::<f64>::zeros();
    let mut cost = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let r = y - edge_model(x, p);
        let j = edge_model_grad(x, p);
        jtj += j * j.transpose();
        jtr += j * r;
        cost += 0.5 * r * r;
    }
    (cost, jtj, jtr)
}

fn is_finite4(v: &Vector4<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}

/// Fit the edge model to `(xs, ys)` starting from `init = [a1, a3, σ, a2]`.
pub fn fit_edge_model(
    xs: &[f64],
    ys: &[f64],
    init: [f64; 4],
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    let n = xs.len().min(ys.len());
    if n < 4 {
        return Err(FitError::TooFewBins { needed: 4, got: n });
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let mut p = Vector4::from(init);
    let (mut cost, mut jtj, mut jtr) = linearize(xs, ys, &p);
    if !cost.is_finite() || !is_finite4(&p) {
        return Err(FitError::NonFinite);
    }

    let max_diag = (0..4).map(|i| jtj[(i, i)]).fold(0.0f64, f64::max);
    let mut lambda = 1e-3 * max_diag.max(1e-12);
    let mut nu = 2.0;
    let max_iters = config.max_iters.max(1);

    for iter in 1..=max_iters {
        if jtr.amax() <= config.gtol {
            return finish(p, iter, cost);
        }

        let mut damped = jtj;
        for i in 0..4 {
            damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
        }
        let Some(delta) = damped.lu().solve(&jtr) else {
            lambda *= nu;
            nu *= 2.0;
            continue;
        };
        if !is_finite4(&delta) {
            lambda *= nu;
            nu *= 2.0;
            continue;
        }

        let small_step = delta.norm() <= config.xtol * (p.norm() + config.xtol);
        let candidate = p + delta;
        let new_cost = cost_at(xs, ys, &candidate);

        if new_cost.is_finite() && new_cost < cost {
            let actual = cost - new_cost;
            let predicted = delta.dot(&jtr) - 0.5 * delta.dot(&(jtj * delta));
            p = candidate;
            let relative_done = actual <= config.ftol * cost && predicted.abs() <= config.ftol * cost;
            let (c, a, b) = linearize(xs, ys, &p);
            cost = c;
            jtj = a;
            jtr = b;
            if relative_done || small_step || cost == 0.0 {
                return finish(p, iter, cost);
            }
            let rho = if predicted > 0.0 { actual / predicted } else { 1.0 };
            lambda *= (1.0f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;
        } else {
            if small_step {
                // no tiny step improves the cost: at a minimum
                return finish(p, iter, cost);
            }
            lambda *= nu;
            nu *= 2.0;
        }
    }

    tracing::debug!(
        "edge fit stopped at iteration cap {}, sigma={:.4}",
        max_iters,
        p[2]
    );
    Err(FitError::DidNotConverge {
        iterations: max_iters,
    })
}

fn finish(p: Vector4<f64>, iterations: usize, cost: f64) -> Result<FitResult, FitError> {
    if !is_finite4(&p) {
        return Err(FitError::NonFinite);
    }
    Ok(FitResult {
        amplitude: p[0],
        center_offset: p[1],
        sigma: p[2],
        baseline: p[3],
        iterations,
        cost,
    })
}

/// Fit the edge model to an ESF, seeded with `a1 = max(intensity)`,
/// `a3 = mean(distance)` and the configured σ and baseline.
pub fn fit_esf(esf: &EdgeSpreadFunction, config: &FitConfig) -> Result<FitResult, FitError> {
    let xs = esf.distances();
    let ys = esf.intensities();
    if xs.len() < 4 {
        return Err(FitError::TooFewBins {
            needed: 4,
            got: xs.len(),
        });
    }
    let a1 = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let a3 = xs.iter().sum::<f64>() / xs.len() as f64;
    fit_edge_model(
        &xs,
        &ys,
        [a1, a3, config.initial_sigma, config.initial_baseline],
        config,
    )
}
