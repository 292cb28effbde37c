//! Single-trace kinetic fitting.
//!
//! Given one absorbance-vs-time trace for Fe3+ + SCN- -> FeSCN2+ under
//! pseudo-first-order conditions, the absorbance approaches a plateau as
//! `A(t) = A_inf - amplitude * exp(-k t)`. We estimate the plateau from the tail
//! of the trace, transform to `ln(A_inf - A)`, and fit a straight line whose
//! slope is `-k`.
//!
//! The model is pluggable: the aggregator only sees the [`KineticModel`] trait,
//! so an exact (non-pseudo) rate law can be swapped in without touching it.

use crate::domain::{FitDiagnostics, RobustKind, Trace, TraceFit};
use crate::error::AppError;
use crate::math::{CovarianceScale, fit_weighted_line, gaussian_reweight};

/// Domain-specific absorbance ceiling for the clipped log transform.
const CLIP_CEILING: f64 = 1.0;

/// Minimum variance of the transformed target before the fit is declared
/// degenerate (clip saturation collapses the target to near-constant).
const MIN_TARGET_VARIANCE: f64 = 1e-10;

/// A kinetic model that can fit one trace.
///
/// Implementations must be `Sync`: the aggregator fits conditions in parallel.
pub trait KineticModel: Sync {
    fn name(&self) -> &'static str;
    fn fit(&self, trace: &Trace) -> Result<TraceFit, AppError>;
}

/// Fitting options shared by kinetic model implementations.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Robust fitting mode (outlier downweighting).
    pub robust: RobustKind,
    /// Number of IRLS reweight iterations.
    pub robust_iters: usize,
    /// Gaussian kernel width in MAD units.
    pub robust_width: f64,
    /// Lower clip bound for `plateau - A` before the log transform.
    pub clip_floor: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            robust: RobustKind::Gaussian,
            robust_iters: 4,
            robust_width: 2.5,
            clip_floor: 1e-6,
        }
    }
}

/// Pseudo-first-order decay fitter.
#[derive(Debug, Clone, Default)]
pub struct PseudoFirstOrder {
    pub opts: FitOptions,
}

impl PseudoFirstOrder {
    pub fn new(opts: FitOptions) -> Self {
        Self { opts }
    }
}

impl KineticModel for PseudoFirstOrder {
    fn name(&self) -> &'static str {
        "pseudo-first-order"
    }

    fn fit(&self, trace: &Trace) -> Result<TraceFit, AppError> {
        let n = trace.len();
        if n < 8 {
            return Err(AppError::data(format!(
                "Trace too short for a kinetic fit: {n} samples (need at least 8)."
            )));
        }
        if !(self.opts.clip_floor.is_finite()
            && self.opts.clip_floor > 0.0
            && self.opts.clip_floor < CLIP_CEILING)
        {
            return Err(AppError::config(format!(
                "Clip floor must be a small positive value below {CLIP_CEILING}, got {}.",
                self.opts.clip_floor
            )));
        }

        let time = trace.time();
        let absorbance = trace.absorbance();

        // Plateau estimate: mean absorbance over the final third of the trace,
        // by sample index. This approximates the asymptote without fitting it.
        let tail_start = n - (n / 3).max(1);
        let tail = &absorbance[tail_start..];
        let plateau = tail.iter().sum::<f64>() / tail.len() as f64;

        // Clipped log transform. The floor guards against noise overshooting the
        // plateau; the ceiling is the absorbance range of the instrument.
        let mut y = Vec::with_capacity(n);
        let mut n_clipped = 0usize;
        for &a in absorbance {
            let d = plateau - a;
            let clipped = d.clamp(self.opts.clip_floor, CLIP_CEILING);
            if clipped != d {
                n_clipped += 1;
            }
            y.push(clipped.ln());
        }

        // Clip saturation check: if the target barely varies, the regression is
        // meaningless and must fail loudly rather than return a junk slope.
        if n_clipped == n || variance(&y) < MIN_TARGET_VARIANCE {
            return Err(AppError::degenerate_fit(format!(
                "Degenerate fit input: clipped {n_clipped}/{n} samples and the \
                 log-transformed target is near-constant."
            )));
        }

        // IRLS: fit, reweight by residuals, refit. Base weights stay immutable;
        // the working weights are rebuilt from them each iteration.
        let w_base = vec![1.0; n];
        let mut w_work = w_base.clone();
        let mut refits = 0usize;

        let n_refits = match self.opts.robust {
            RobustKind::None => 1,
            RobustKind::Gaussian => self.opts.robust_iters.saturating_add(1).max(1),
        };

        let mut fit = fit_weighted_line(time, &y, &w_work, CovarianceScale::ResidualVariance)?;
        for _ in 1..n_refits {
            let residuals: Vec<f64> = time
                .iter()
                .zip(y.iter())
                .map(|(&t, &yi)| yi - fit.predict(t))
                .collect();
            w_work = gaussian_reweight(&w_base, &residuals, self.opts.robust_width);
            fit = fit_weighted_line(time, &y, &w_work, CovarianceScale::ResidualVariance)?;
            refits += 1;
        }

        Ok(TraceFit {
            params: fit.params,
            cov: fit.cov,
            diagnostics: FitDiagnostics {
                n_samples: n,
                n_clipped,
                refits,
                wsse: fit.wsse,
            },
        })
    }
}

fn variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}
