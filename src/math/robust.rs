//! Gaussian-kernel residual reweighting for IRLS.
//!
//! The single-trace fitter refits its line a few times, each time down-weighting
//! samples whose residuals are large relative to the bulk. The residual scale is
//! estimated with the MAD (median absolute deviation), so the scheme is
//! deterministic and insensitive to the outliers it is meant to suppress.

/// Down-weight high-residual samples with a Gaussian kernel.
///
/// Each base weight is multiplied by `exp(-0.5 * (r / (width * scale))^2)` where
/// `scale` is the MAD-derived residual scale. Weights are floored at a tiny
/// fraction of the base weight so no sample is removed outright.
pub fn gaussian_reweight(w_base: &[f64], residuals: &[f64], width: f64) -> Vec<f64> {
    let mut abs: Vec<f64> = residuals.iter().map(|r| r.abs()).filter(|v| v.is_finite()).collect();
    let mad = median_mut(&mut abs).unwrap_or(0.0);
    let scale = (mad / 0.6745).max(1e-12);
    let kernel_width = width.max(1e-6) * scale;

    let min_factor = 1e-6;
    w_base
        .iter()
        .zip(residuals.iter())
        .map(|(&w0, &r)| {
            let factor = if r.is_finite() {
                let u = r / kernel_width;
                (-0.5 * u * u).exp()
            } else {
                min_factor
            };
            (w0 * factor).max(w0 * min_factor)
        })
        .collect()
}

fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlier_is_crushed_inliers_survive() {
        let w0 = vec![1.0; 9];
        let mut residuals = vec![0.1, -0.08, 0.12, -0.11, 0.09, -0.1, 0.11, -0.09];
        residuals.push(50.0);

        let w = gaussian_reweight(&w0, &residuals, 2.5);
        // Inliers keep most of their weight.
        for &wi in &w[..8] {
            assert!(wi > 0.5, "inlier weight too small: {wi}");
        }
        // The outlier is floored near zero.
        assert!(w[8] < 1e-5, "outlier weight too large: {}", w[8]);
    }

    #[test]
    fn near_zero_residuals_keep_full_weight() {
        let w0 = vec![2.0; 5];
        let residuals = vec![1e-15, -1e-15, 0.0, 1e-16, -1e-16];
        let w = gaussian_reweight(&w0, &residuals, 2.5);
        for &wi in &w {
            assert!(wi > 1.0);
        }
    }

    #[test]
    fn median_handles_even_and_odd() {
        assert_eq!(median_mut(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_mut(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median_mut(&mut []), None);
    }
}
