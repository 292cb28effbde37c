//! Weighted least squares line fitting with parameter covariance.
//!
//! Every regression in this project is a straight line `y = a + b*x` solved under
//! per-sample weights:
//!
//! ```text
//! minimize Σ w_i (y_i - a - b x_i)^2
//! ```
//!
//! Implementation choices:
//! - We scale rows by `sqrt(w_i)` and solve an ordinary least-squares problem
//!   via SVD, which stays robust when the design matrix is tall.
//! - The parameter covariance comes from the 2x2 normal matrix:
//!   `cov = s^2 * (X^T W X)^-1`, where `s^2` depends on how the weights are
//!   interpreted (see [`CovarianceScale`]).

use nalgebra::{DMatrix, DVector, Matrix2};

use crate::error::AppError;

/// How to scale `(X^T W X)^-1` into a parameter covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceScale {
    /// Weights are relative; scale by the reduced chi-square `wsse / (n - 2)`.
    ResidualVariance,
    /// Weights are true inverse variances; use `(X^T W X)^-1` directly.
    Unit,
}

/// A fitted line with its parameter covariance.
#[derive(Debug, Clone)]
pub struct LineFit {
    /// `[intercept, slope]`.
    pub params: [f64; 2],
    /// 2x2 covariance, same ordering as `params`.
    pub cov: [[f64; 2]; 2],
    /// Weighted sum of squared residuals.
    pub wsse: f64,
    pub n: usize,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.params[0] + self.params[1] * x
    }
}

/// Fit `y = a + b*x` under weights `w`.
///
/// Requires at least 2 samples (with exactly 2, `ResidualVariance` scaling yields
/// a zero covariance since there are no residual degrees of freedom).
pub fn fit_weighted_line(
    x: &[f64],
    y: &[f64],
    w: &[f64],
    scale: CovarianceScale,
) -> Result<LineFit, AppError> {
    let n = x.len();
    if y.len() != n || w.len() != n {
        return Err(AppError::config(format!(
            "Regression input length mismatch: x={}, y={}, w={}.",
            n,
            y.len(),
            w.len()
        )));
    }
    if n < 2 {
        return Err(AppError::data(format!("Need at least 2 samples to fit a line, got {n}.")));
    }
    if x.iter().any(|v| !v.is_finite()) || y.iter().any(|v| !v.is_finite()) {
        return Err(AppError::config("Non-finite regression inputs."));
    }
    if w.iter().any(|v| !v.is_finite() || *v <= 0.0) {
        return Err(AppError::config("Regression weights must be finite and > 0."));
    }

    // Build the sqrt-weighted design matrix and observation vector.
    let mut xw = DMatrix::<f64>::zeros(n, 2);
    let mut yw = DVector::<f64>::zeros(n);
    for i in 0..n {
        let sw = w[i].sqrt();
        xw[(i, 0)] = sw;
        xw[(i, 1)] = sw * x[i];
        yw[i] = sw * y[i];
    }

    let beta = solve_least_squares(&xw, &yw)
        .ok_or_else(|| AppError::fit("Least-squares system too ill-conditioned to solve."))?;
    let (a, b) = (beta[0], beta[1]);

    let mut wsse = 0.0;
    for i in 0..n {
        let r = y[i] - a - b * x[i];
        wsse += w[i] * r * r;
    }
    if !wsse.is_finite() {
        return Err(AppError::fit("Non-finite residual sum in line fit."));
    }

    // 2x2 normal matrix Σ w [1 x; x x^2].
    let mut s0 = 0.0;
    let mut s1 = 0.0;
    let mut s2 = 0.0;
    for i in 0..n {
        s0 += w[i];
        s1 += w[i] * x[i];
        s2 += w[i] * x[i] * x[i];
    }
    let normal = Matrix2::new(s0, s1, s1, s2);
    let inv = normal
        .try_inverse()
        .ok_or_else(|| AppError::fit("Singular normal matrix in line fit (constant x?)."))?;

    let s2_scale = match scale {
        CovarianceScale::ResidualVariance => {
            if n > 2 {
                wsse / (n as f64 - 2.0)
            } else {
                0.0
            }
        }
        CovarianceScale::Unit => 1.0,
    };

    let cov = [
        [s2_scale * inv[(0, 0)], s2_scale * inv[(0, 1)]],
        [s2_scale * inv[(1, 0)], s2_scale * inv[(1, 1)]],
    ];
    if cov.iter().flatten().any(|v| !v.is_finite()) {
        return Err(AppError::fit("Non-finite parameter covariance in line fit."));
    }

    Ok(LineFit {
        params: [a, b],
        cov,
        wsse,
        n,
    })
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
