//! Arrhenius regression: activation energy from rate constants.
//!
//! For one ionic strength, the combined rate constants across temperatures obey
//!
//! ```text
//! k(T) = A * exp(-Ea / (R T))      =>      ln k = ln A - (Ea/R) * (1/T)
//! ```
//!
//! We fit the linearized form by weighted least squares, with each point
//! weighted by `1 / sigma_ln(k)^2` (the log-domain uncertainty propagated from
//! the rate constant's absolute uncertainty).

use crate::domain::{ArrheniusFit, RateConstant};
use crate::error::AppError;
use crate::math::{CovarianceScale, fit_weighted_line};

/// Molar gas constant, J/(mol K).
pub const GAS_CONSTANT: f64 = 8.314;

/// Floor for the log-domain uncertainty so exactly-known rate constants still
/// produce finite weights.
const MIN_LN_SIGMA: f64 = 1e-12;

/// Regress ln(k) on 1/T and recover the activation energy.
///
/// `temperatures_k` and `rates` are parallel slices, one entry per temperature
/// level of a single ionic strength.
pub fn fit_arrhenius(
    temperatures_k: &[f64],
    rates: &[RateConstant],
) -> Result<ArrheniusFit, AppError> {
    if temperatures_k.len() != rates.len() {
        return Err(AppError::config(format!(
            "Arrhenius input length mismatch: {} temperatures vs {} rate constants.",
            temperatures_k.len(),
            rates.len()
        )));
    }
    if temperatures_k.len() < 2 {
        return Err(AppError::insufficient_points(format!(
            "Arrhenius regression needs at least 2 (T, k) pairs, got {}.",
            temperatures_k.len()
        )));
    }

    let n = temperatures_k.len();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    let mut w = Vec::with_capacity(n);

    for (&temp, rate) in temperatures_k.iter().zip(rates.iter()) {
        if !(temp.is_finite() && temp > 0.0) {
            return Err(AppError::config(format!("Invalid absolute temperature {temp} K.")));
        }
        // Rejects k <= 0 before the log transform.
        let ln_sigma = rate.ln_uncertainty()?.max(MIN_LN_SIGMA);
        x.push(1.0 / temp);
        y.push(rate.value.ln());
        w.push(1.0 / (ln_sigma * ln_sigma));
    }

    let fit = fit_weighted_line(&x, &y, &w, CovarianceScale::Unit)?;
    let slope_sigma = fit.cov[1][1].max(0.0).sqrt();

    Ok(ArrheniusFit {
        ln_pre_exponential: fit.params[0],
        slope: fit.params[1],
        activation_energy: -fit.params[1] * GAS_CONSTANT,
        activation_energy_sigma: slope_sigma * GAS_CONSTANT,
        n_points: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_arrhenius_law_is_recovered() {
        let a = 5.0e9;
        let ea = 52_000.0; // J/mol
        let temps = [288.15, 293.15, 298.15, 303.15, 308.15];
        let rates: Vec<RateConstant> = temps
            .iter()
            .map(|&t| RateConstant {
                value: a * (-ea / (GAS_CONSTANT * t)).exp(),
                sigma: 0.0,
            })
            .collect();

        let fit = fit_arrhenius(&temps, &rates).unwrap();
        assert!(
            (fit.activation_energy - ea).abs() / ea < 1e-9,
            "expected Ea ~ {ea}, got {}",
            fit.activation_energy
        );
        assert!((fit.ln_pre_exponential - a.ln()).abs() < 1e-7);
    }

    #[test]
    fn noisier_points_pull_less() {
        // Two exact points determine the line; a wildly uncertain third barely moves it.
        let temps = [290.0, 300.0, 310.0];
        let ea = 50_000.0;
        let a: f64 = 1.0e9;
        let k = |t: f64| a * (-ea / (GAS_CONSTANT * t)).exp();
        let rates = [
            RateConstant { value: k(290.0), sigma: 1e-9 },
            RateConstant { value: k(300.0), sigma: 1e-9 },
            RateConstant { value: k(310.0) * 3.0, sigma: k(310.0) * 2.0 },
        ];

        let fit = fit_arrhenius(&temps, &rates).unwrap();
        assert!((fit.activation_energy - ea).abs() / ea < 0.01);
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        let temps = [290.0, 300.0];
        let rates = [
            RateConstant { value: 10.0, sigma: 0.1 },
            RateConstant { value: 0.0, sigma: 0.1 },
        ];
        let err = fit_arrhenius(&temps, &rates).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NonPositiveRateConstant);
    }

    #[test]
    fn single_point_is_insufficient() {
        let err = fit_arrhenius(&[298.15], &[RateConstant { value: 15.0, sigma: 0.5 }])
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InsufficientPoints);
    }

    #[test]
    fn two_points_are_enough() {
        let temps = [290.0, 310.0];
        let ea = 48_000.0;
        let a: f64 = 2.0e9;
        let rates: Vec<RateConstant> = temps
            .iter()
            .map(|&t| RateConstant {
                value: a * (-ea / (GAS_CONSTANT * t)).exp(),
                sigma: 0.0,
            })
            .collect();
        let fit = fit_arrhenius(&temps, &rates).unwrap();
        assert!((fit.activation_energy - ea).abs() / ea < 1e-9);
    }
}
