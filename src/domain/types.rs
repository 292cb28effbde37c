//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for reporting or comparisons

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifies one experimental condition: an ionic-strength level crossed with a
/// temperature level. Replicates under the same condition share this key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionKey {
    pub ionic_id: u8,
    pub temp_id: u8,
}

impl std::fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "I{}/T{}", self.ionic_id, self.temp_id)
    }
}

/// Immutable lookup tables describing the experimental grid.
///
/// These replace the notebook-era global dictionaries: the tables are constructed
/// once (from JSON or the built-in reference scenario) and passed read-only into
/// the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionTables {
    /// ionic-strength-id -> physical ionic strength (mol/L).
    pub ionic_strength: BTreeMap<u8, f64>,
    /// temperature-id -> absolute temperature (K).
    pub temperature_k: BTreeMap<u8, f64>,
    /// Replicate traces expected per condition.
    pub replicates: usize,
}

impl ConditionTables {
    /// The reference stopped-flow scenario: 4 ionic strengths x 5 temperatures,
    /// 7 replicates per condition.
    pub fn reference() -> Self {
        Self {
            ionic_strength: BTreeMap::from([(0, 0.10), (1, 0.25), (2, 0.50), (3, 1.00)]),
            temperature_k: BTreeMap::from([
                (0, 288.15),
                (1, 293.15),
                (2, 298.15),
                (3, 303.15),
                (4, 308.15),
            ]),
            replicates: 7,
        }
    }

    pub fn ionic_strength_for(&self, ionic_id: u8) -> Result<f64, AppError> {
        self.ionic_strength
            .get(&ionic_id)
            .copied()
            .ok_or_else(|| AppError::config(format!("Unknown ionic-strength id {ionic_id}.")))
    }

    pub fn temperature_for(&self, temp_id: u8) -> Result<f64, AppError> {
        self.temperature_k
            .get(&temp_id)
            .copied()
            .ok_or_else(|| AppError::config(format!("Unknown temperature id {temp_id}.")))
    }

    /// All condition keys on the grid, in (ionic, temperature) order.
    pub fn grid(&self) -> Vec<ConditionKey> {
        let mut out = Vec::with_capacity(self.ionic_strength.len() * self.temperature_k.len());
        for &ionic_id in self.ionic_strength.keys() {
            for &temp_id in self.temperature_k.keys() {
                out.push(ConditionKey { ionic_id, temp_id });
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.ionic_strength.is_empty() || self.temperature_k.is_empty() {
            return Err(AppError::config("Condition tables must not be empty."));
        }
        if self.replicates == 0 {
            return Err(AppError::config("Replicate count must be > 0."));
        }
        for (&id, &v) in &self.ionic_strength {
            if !(v.is_finite() && v > 0.0) {
                return Err(AppError::config(format!("Invalid ionic strength for id {id}: {v}.")));
            }
        }
        for (&id, &t) in &self.temperature_k {
            if !(t.is_finite() && t > 0.0) {
                return Err(AppError::config(format!("Invalid temperature for id {id}: {t} K.")));
            }
        }
        Ok(())
    }
}

/// One replicate's absorbance-vs-time trace, in (seconds, dimensionless) units.
///
/// Traces are created once at load time and never mutated; fields are private so
/// fitters can only read them.
#[derive(Debug, Clone)]
pub struct Trace {
    time: Vec<f64>,
    absorbance: Vec<f64>,
}

impl Trace {
    pub fn new(time: Vec<f64>, absorbance: Vec<f64>) -> Result<Self, AppError> {
        if time.len() != absorbance.len() {
            return Err(AppError::config(format!(
                "Trace column length mismatch: {} time vs {} absorbance samples.",
                time.len(),
                absorbance.len()
            )));
        }
        if time.is_empty() {
            return Err(AppError::data("Empty trace."));
        }
        if time.iter().any(|t| !t.is_finite()) || absorbance.iter().any(|a| !a.is_finite()) {
            return Err(AppError::config("Trace contains non-finite samples."));
        }
        if time.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::config("Trace time samples must be strictly increasing."));
        }
        Ok(Self { time, absorbance })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn absorbance(&self) -> &[f64] {
        &self.absorbance
    }
}

/// Solver diagnostics for a single-trace fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Samples in the trace.
    pub n_samples: usize,
    /// Samples clipped at the lower bound of the log transform.
    pub n_clipped: usize,
    /// Robust reweight refits performed (0 for a plain weighted fit).
    pub refits: usize,
    /// Weighted sum of squared residuals at the final iteration.
    pub wsse: f64,
}

/// Result of fitting the linearized decay model to one trace.
///
/// `params` is `[intercept, slope]` of `ln(plateau - A) = a + b*t`; the decay
/// rate constant is `k = -b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFit {
    pub params: [f64; 2],
    /// 2x2 parameter covariance, same ordering as `params`.
    pub cov: [[f64; 2]; 2],
    pub diagnostics: FitDiagnostics,
}

impl TraceFit {
    pub fn slope(&self) -> f64 {
        self.params[1]
    }
}

/// Inverse-covariance-weighted combination of replicate fits for one condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragedEstimate {
    pub params: [f64; 2],
    pub cov: [[f64; 2]; 2],
    /// Replicate fits that contributed to the average.
    pub n_combined: usize,
}

impl AveragedEstimate {
    /// Recover the condition's rate constant from the combined slope.
    pub fn rate_constant(&self) -> RateConstant {
        RateConstant {
            value: -self.params[1],
            sigma: self.cov[1][1].max(0.0).sqrt(),
        }
    }
}

/// A derived rate constant with its absolute uncertainty (both in 1/s).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateConstant {
    pub value: f64,
    pub sigma: f64,
}

impl RateConstant {
    /// Propagate the absolute uncertainty in `k` into an uncertainty in `ln(k)`
    /// via a symmetrized finite difference:
    ///
    /// `sigma_ln(k) ~ (ln(k + sigma) - ln(k - sigma)) / 2`
    ///
    /// When `k - sigma` would cross zero the difference is taken one-sided.
    pub fn ln_uncertainty(&self) -> Result<f64, AppError> {
        if !(self.value.is_finite() && self.value > 0.0) {
            return Err(AppError::non_positive_rate(format!(
                "Rate constant {:.6e} 1/s is not positive; cannot take its log.",
                self.value
            )));
        }
        let sigma = self.sigma.abs();
        let lo = self.value - sigma;
        if lo > 0.0 {
            Ok(((self.value + sigma).ln() - lo.ln()) / 2.0)
        } else {
            Ok((self.value + sigma).ln() - self.value.ln())
        }
    }
}

/// Weighted ln(k) vs 1/T regression output for one ionic strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrheniusFit {
    /// Intercept of the linearized fit, ln(A).
    pub ln_pre_exponential: f64,
    /// Slope of ln(k) against 1/T, equal to -Ea/R.
    pub slope: f64,
    /// Activation energy, J/mol.
    pub activation_energy: f64,
    /// Standard uncertainty of the activation energy, J/mol.
    pub activation_energy_sigma: f64,
    /// (T, k) pairs used in the regression.
    pub n_points: usize,
}

/// Outlier-robust fitting mode for the single-trace fitter.
///
/// When enabled, the fitter iteratively reweights samples based on residuals
/// (Gaussian-kernel IRLS). This reduces sensitivity to baseline drift and
/// occasional instrument artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RobustKind {
    /// Plain weighted least squares (no reweighting).
    None,
    /// Gaussian-kernel M-estimator via iterative reweighted least squares.
    Gaussian,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub archive_path: PathBuf,
    /// Optional condition tables JSON; the reference scenario is used when absent.
    pub tables_path: Option<PathBuf>,
    /// Optional curated replicate exclusion list JSON.
    pub exclusions_path: Option<PathBuf>,

    /// Robust fitting mode.
    pub robust: RobustKind,
    /// Number of IRLS reweight iterations (0 disables reweighting even if robust!=none).
    pub robust_iters: usize,
    /// Gaussian kernel width in units of the MAD residual scale.
    pub robust_width: f64,
    /// Lower clip bound for the log transform (guards against noise overshooting
    /// the plateau).
    pub clip_floor: f64,

    pub export_rates: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_tables_validate() {
        let tables = ConditionTables::reference();
        tables.validate().unwrap();
        assert_eq!(tables.grid().len(), 20);
        assert_eq!(tables.replicates, 7);
    }

    #[test]
    fn trace_rejects_unordered_time() {
        let err = Trace::new(vec![0.0, 0.2, 0.1], vec![0.1, 0.2, 0.3]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ln_uncertainty_matches_symmetric_difference() {
        let k = RateConstant { value: 10.0, sigma: 0.5 };
        let expected = ((10.5_f64).ln() - (9.5_f64).ln()) / 2.0;
        assert!((k.ln_uncertainty().unwrap() - expected).abs() < 1e-15);
    }

    #[test]
    fn ln_uncertainty_rejects_non_positive_rate() {
        let k = RateConstant { value: -1.0, sigma: 0.5 };
        let err = k.ln_uncertainty().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NonPositiveRateConstant);
    }
}
