//! Formatted terminal output for analysis runs.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::app::pipeline::RunOutput;
use crate::domain::ConditionTables;

/// Format the full run summary: condition grid, Arrhenius fits, and any
/// skipped replicates/conditions.
pub fn format_run_summary(output: &RunOutput, tables: &ConditionTables) -> String {
    let mut out = String::new();

    out.push_str("=== sfk - Stopped-Flow Kinetics (Fe3+ + SCN-) ===\n");
    out.push_str(&format!(
        "Grid: {} ionic strengths x {} temperatures | {} replicates/condition\n",
        tables.ionic_strength.len(),
        tables.temperature_k.len(),
        tables.replicates,
    ));
    out.push('\n');

    out.push_str(&format_rate_table(output, tables));
    out.push('\n');
    out.push_str(&format_arrhenius_table(output));

    let notes = format_failures(output);
    if !notes.is_empty() {
        out.push('\n');
        out.push_str(&notes);
    }

    out
}

/// Per-condition rate constants, one row per grid cell.
pub fn format_rate_table(output: &RunOutput, tables: &ConditionTables) -> String {
    let mut out = String::new();
    out.push_str("Rate constants:\n");
    out.push_str(&format!(
        "{:<10} {:>8} {:>9} {:>12} {:>12} {:>6}\n",
        "condition", "I (M)", "T (K)", "k (1/s)", "sigma", "reps"
    ));

    for cond in &output.batch.conditions {
        let ionic = tables.ionic_strength_for(cond.key.ionic_id).unwrap_or(f64::NAN);
        let temp = tables.temperature_for(cond.key.temp_id).unwrap_or(f64::NAN);
        out.push_str(&format!(
            "{:<10} {:>8.3} {:>9.2} {:>12.4} {:>12.4} {:>6}\n",
            cond.key.to_string(),
            ionic,
            temp,
            cond.rate.value,
            cond.rate.sigma,
            cond.estimate.n_combined,
        ));
    }

    out
}

/// Per-ionic-strength activation energies.
pub fn format_arrhenius_table(output: &RunOutput) -> String {
    let mut out = String::new();
    out.push_str("Arrhenius fits (per ionic strength):\n");
    out.push_str(&format!(
        "{:<10} {:>8} {:>14} {:>12} {:>8} {:>4}\n",
        "series", "I (M)", "Ea (kJ/mol)", "sigma", "ln A", "n"
    ));

    for s in &output.series {
        out.push_str(&format!(
            "I{:<9} {:>8.3} {:>14.2} {:>12.2} {:>8.2} {:>4}\n",
            s.ionic_id,
            s.ionic_strength,
            s.fit.activation_energy / 1000.0,
            s.fit.activation_energy_sigma / 1000.0,
            s.fit.ln_pre_exponential,
            s.fit.n_points,
        ));
    }

    out
}

fn format_failures(output: &RunOutput) -> String {
    let mut out = String::new();

    for cond in &output.batch.conditions {
        for skip in &cond.skipped {
            out.push_str(&format!(
                "note: condition {} replicate {} skipped: {}\n",
                cond.key, skip.replicate, skip.reason
            ));
        }
    }
    for (key, reason) in &output.batch.failed {
        out.push_str(&format!("warning: condition {key} failed: {reason}\n"));
    }
    for (ionic_id, reason) in &output.skipped_series {
        out.push_str(&format!("warning: Arrhenius series I{ionic_id} skipped: {reason}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrheniusFit, AveragedEstimate, ConditionKey};
    use crate::fit::aggregate::{BatchOutput, ConditionEstimate, SkippedReplicate};
    use crate::app::pipeline::IonicSeries;

    #[test]
    fn summary_mentions_conditions_and_series() {
        let tables = ConditionTables::reference();
        let estimate = AveragedEstimate {
            params: [-0.8, -15.0],
            cov: [[1e-4, 0.0], [0.0, 4e-2]],
            n_combined: 6,
        };
        let output = RunOutput {
            batch: BatchOutput {
                conditions: vec![ConditionEstimate {
                    key: ConditionKey { ionic_id: 1, temp_id: 2 },
                    rate: estimate.rate_constant(),
                    estimate,
                    skipped: vec![SkippedReplicate {
                        replicate: 3,
                        reason: "degenerate".to_string(),
                    }],
                }],
                failed: Vec::new(),
            },
            series: vec![IonicSeries {
                ionic_id: 1,
                ionic_strength: 0.25,
                fit: ArrheniusFit {
                    ln_pre_exponential: 22.9,
                    slope: -6013.0,
                    activation_energy: 50_000.0,
                    activation_energy_sigma: 900.0,
                    n_points: 5,
                },
            }],
            skipped_series: Vec::new(),
        };

        let text = format_run_summary(&output, &tables);
        assert!(text.contains("I1/T2"));
        assert!(text.contains("50.00"));
        assert!(text.contains("replicate 3 skipped"));
    }
}
