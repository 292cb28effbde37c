//! Export analysis results to CSV/JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream
//! scripts; the JSON carries the full analysis for later comparisons.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::pipeline::RunOutput;
use crate::domain::{ArrheniusFit, ConditionTables};
use crate::error::AppError;

/// Write per-condition rate constants to a CSV file.
pub fn write_rates_csv(
    path: &Path,
    output: &RunOutput,
    tables: &ConditionTables,
) -> Result<(), AppError> {
    let mut file = File::create(path).map_err(|e| {
        AppError::config(format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;

    writeln!(
        file,
        "ionic_id,temp_id,ionic_strength_m,temperature_k,k_per_s,k_sigma_per_s,replicates_used,replicates_skipped"
    )
    .map_err(|e| AppError::config(format!("Failed to write export CSV header: {e}")))?;

    for cond in &output.batch.conditions {
        writeln!(
            file,
            "{},{},{:.4},{:.2},{:.6e},{:.6e},{},{}",
            cond.key.ionic_id,
            cond.key.temp_id,
            tables.ionic_strength_for(cond.key.ionic_id)?,
            tables.temperature_for(cond.key.temp_id)?,
            cond.rate.value,
            cond.rate.sigma,
            cond.estimate.n_combined,
            cond.skipped.len(),
        )
        .map_err(|e| AppError::config(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Portable JSON schema for a full analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisFile {
    pub tool: String,
    pub conditions: Vec<ConditionRecord>,
    pub arrhenius: Vec<ArrheniusRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub ionic_id: u8,
    pub temp_id: u8,
    pub ionic_strength_m: f64,
    pub temperature_k: f64,
    pub k_per_s: f64,
    pub k_sigma_per_s: f64,
    pub replicates_used: usize,
    pub replicates_skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrheniusRecord {
    pub ionic_id: u8,
    pub ionic_strength_m: f64,
    #[serde(flatten)]
    pub fit: ArrheniusFit,
}

/// Write the full analysis to a pretty JSON file.
pub fn write_analysis_json(
    path: &Path,
    output: &RunOutput,
    tables: &ConditionTables,
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::config(format!("Failed to create analysis JSON '{}': {e}", path.display()))
    })?;

    let analysis = build_analysis_file(output, tables)?;
    serde_json::to_writer_pretty(file, &analysis)
        .map_err(|e| AppError::config(format!("Failed to write analysis JSON: {e}")))?;

    Ok(())
}

fn build_analysis_file(
    output: &RunOutput,
    tables: &ConditionTables,
) -> Result<AnalysisFile, AppError> {
    let mut conditions = Vec::with_capacity(output.batch.conditions.len());
    for cond in &output.batch.conditions {
        conditions.push(ConditionRecord {
            ionic_id: cond.key.ionic_id,
            temp_id: cond.key.temp_id,
            ionic_strength_m: tables.ionic_strength_for(cond.key.ionic_id)?,
            temperature_k: tables.temperature_for(cond.key.temp_id)?,
            k_per_s: cond.rate.value,
            k_sigma_per_s: cond.rate.sigma,
            replicates_used: cond.estimate.n_combined,
            replicates_skipped: cond.skipped.len(),
        });
    }

    let arrhenius = output
        .series
        .iter()
        .map(|s| ArrheniusRecord {
            ionic_id: s.ionic_id,
            ionic_strength_m: s.ionic_strength,
            fit: s.fit.clone(),
        })
        .collect();

    Ok(AnalysisFile {
        tool: "sfk".to_string(),
        conditions,
        arrhenius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrheniusFit, AveragedEstimate, ConditionKey};
    use crate::fit::aggregate::{BatchOutput, ConditionEstimate};
    use crate::app::pipeline::IonicSeries;

    fn tiny_output() -> (RunOutput, ConditionTables) {
        let tables = ConditionTables::reference();
        let estimate = AveragedEstimate {
            params: [-0.8, -15.0],
            cov: [[1e-4, 0.0], [0.0, 4e-2]],
            n_combined: 7,
        };
        let cond = ConditionEstimate {
            key: ConditionKey { ionic_id: 0, temp_id: 2 },
            rate: estimate.rate_constant(),
            estimate,
            skipped: Vec::new(),
        };
        let series = IonicSeries {
            ionic_id: 0,
            ionic_strength: 0.10,
            fit: ArrheniusFit {
                ln_pre_exponential: 22.9,
                slope: -6013.0,
                activation_energy: 50_000.0,
                activation_energy_sigma: 900.0,
                n_points: 5,
            },
        };
        let output = RunOutput {
            batch: BatchOutput {
                conditions: vec![cond],
                failed: Vec::new(),
            },
            series: vec![series],
            skipped_series: Vec::new(),
        };
        (output, tables)
    }

    #[test]
    fn analysis_file_carries_physical_lookups() {
        let (output, tables) = tiny_output();
        let file = build_analysis_file(&output, &tables).unwrap();

        assert_eq!(file.tool, "sfk");
        assert_eq!(file.conditions.len(), 1);
        assert!((file.conditions[0].temperature_k - 298.15).abs() < 1e-9);
        assert!((file.conditions[0].k_per_s - 15.0).abs() < 1e-12);
        assert_eq!(file.arrhenius.len(), 1);
        assert!((file.arrhenius[0].fit.activation_energy - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn analysis_file_serializes_to_json() {
        let (output, tables) = tiny_output();
        let file = build_analysis_file(&output, &tables).unwrap();
        let json = serde_json::to_string_pretty(&file).unwrap();
        assert!(json.contains("\"activation_energy\""));
        assert!(json.contains("\"k_per_s\""));
    }
}
