//! Batch fitting and replicate aggregation.
//!
//! Each experimental condition has several replicate traces. We fit every
//! replicate independently and combine the per-replicate (parameters,
//! covariance) pairs by inverse-covariance weighting:
//!
//! ```text
//! C = (Σ C_i^-1)^-1        β = C · Σ C_i^-1 β_i
//! ```
//!
//! so noisier replicates contribute less, and the combined covariance is the
//! properly propagated one rather than a naive spread.
//!
//! Partial-failure policy: a replicate whose fit fails is skipped and recorded
//! in the condition's diagnostics; the condition itself fails only when no
//! replicate survives. Conditions are independent, so they are fitted in
//! parallel.

use std::collections::BTreeMap;

use nalgebra::{Matrix2, Vector2};
use rayon::prelude::*;

use crate::domain::{AveragedEstimate, ConditionKey, RateConstant, Trace, TraceFit};
use crate::error::AppError;
use crate::fit::kinetic::KineticModel;

/// One replicate that was skipped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedReplicate {
    pub replicate: usize,
    pub reason: String,
}

/// Combined fit for one condition.
#[derive(Debug, Clone)]
pub struct ConditionEstimate {
    pub key: ConditionKey,
    pub estimate: AveragedEstimate,
    pub rate: RateConstant,
    pub skipped: Vec<SkippedReplicate>,
}

/// Output of fitting every condition.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Successful conditions, in key order.
    pub conditions: Vec<ConditionEstimate>,
    /// Conditions where no replicate produced a usable fit.
    pub failed: Vec<(ConditionKey, String)>,
}

/// Fit every replicate of every condition and combine per-condition estimates.
pub fn fit_all_conditions(
    groups: &BTreeMap<ConditionKey, Vec<Trace>>,
    model: &dyn KineticModel,
) -> Result<BatchOutput, AppError> {
    if groups.is_empty() {
        return Err(AppError::data("No conditions to fit."));
    }

    let items: Vec<(&ConditionKey, &Vec<Trace>)> = groups.iter().collect();
    let results: Vec<(ConditionKey, Result<ConditionEstimate, AppError>)> = items
        .par_iter()
        .map(|&(key, traces)| (*key, fit_condition(*key, traces, model)))
        .collect();

    let mut conditions = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (key, result) in results {
        match result {
            Ok(estimate) => conditions.push(estimate),
            Err(e) => failed.push((key, e.to_string())),
        }
    }

    if conditions.is_empty() {
        return Err(AppError::fit(format!(
            "All {} conditions failed to fit; first failure: {} ({}).",
            failed.len(),
            failed[0].0,
            failed[0].1
        )));
    }

    Ok(BatchOutput { conditions, failed })
}

fn fit_condition(
    key: ConditionKey,
    traces: &[Trace],
    model: &dyn KineticModel,
) -> Result<ConditionEstimate, AppError> {
    let mut fits = Vec::with_capacity(traces.len());
    let mut skipped = Vec::new();

    for (i, trace) in traces.iter().enumerate() {
        match model.fit(trace) {
            Ok(fit) => fits.push(fit),
            Err(e) => skipped.push(SkippedReplicate {
                replicate: i,
                reason: e.to_string(),
            }),
        }
    }

    let estimate = combine_estimates(&fits)
        .map_err(|e| AppError::new(e.kind(), format!("Condition {key}: {e}")))?;
    let rate = estimate.rate_constant();

    Ok(ConditionEstimate {
        key,
        estimate,
        rate,
        skipped,
    })
}

/// Inverse-covariance-weighted average of replicate fits.
pub fn combine_estimates(fits: &[TraceFit]) -> Result<AveragedEstimate, AppError> {
    if fits.is_empty() {
        return Err(AppError::data("No replicate fits to combine."));
    }

    let mut precision_sum = Matrix2::<f64>::zeros();
    let mut weighted_params = Vector2::<f64>::zeros();

    for fit in fits {
        let cov = Matrix2::new(fit.cov[0][0], fit.cov[0][1], fit.cov[1][0], fit.cov[1][1]);
        let precision = cov.try_inverse().ok_or_else(|| {
            AppError::degenerate_fit("Replicate covariance is singular; cannot weight it.")
        })?;
        precision_sum += precision;
        weighted_params += precision * Vector2::new(fit.params[0], fit.params[1]);
    }

    let combined_cov = precision_sum
        .try_inverse()
        .ok_or_else(|| AppError::fit("Combined precision matrix is singular."))?;
    let combined_params = combined_cov * weighted_params;

    if combined_params.iter().any(|v| !v.is_finite())
        || combined_cov.iter().any(|v| !v.is_finite())
    {
        return Err(AppError::fit("Non-finite combined estimate."));
    }

    Ok(AveragedEstimate {
        params: [combined_params[0], combined_params[1]],
        cov: [
            [combined_cov[(0, 0)], combined_cov[(0, 1)]],
            [combined_cov[(1, 0)], combined_cov[(1, 1)]],
        ],
        n_combined: fits.len(),
    })
}
