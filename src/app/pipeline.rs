//! Shared analysis pipeline used by the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! archive load -> per-trace fits -> replicate aggregation -> Arrhenius fits
//!
//! The subcommands then focus on presentation (summary vs rates-only output).

use std::collections::BTreeMap;

use crate::domain::{AnalysisConfig, ConditionKey, ConditionTables, RateConstant, Trace};
use crate::error::AppError;
use crate::fit::aggregate::{BatchOutput, fit_all_conditions};
use crate::fit::arrhenius::fit_arrhenius;
use crate::fit::kinetic::{FitOptions, KineticModel, PseudoFirstOrder};
use crate::io::archive::{ExclusionList, group_by_condition, read_archive};

/// One ionic strength's Arrhenius regression.
#[derive(Debug, Clone)]
pub struct IonicSeries {
    pub ionic_id: u8,
    pub ionic_strength: f64,
    pub fit: crate::domain::ArrheniusFit,
}

/// All computed outputs of a single `sfk analyze` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub batch: BatchOutput,
    /// Successful Arrhenius fits, one per ionic strength.
    pub series: Vec<IonicSeries>,
    /// Ionic strengths whose Arrhenius regression failed, with the reason.
    pub skipped_series: Vec<(u8, String)>,
}

/// Execute the full analysis pipeline from an archive on disk.
pub fn run_analysis(config: &AnalysisConfig) -> Result<(RunOutput, ConditionTables), AppError> {
    let tables = match &config.tables_path {
        Some(path) => {
            let file = std::fs::File::open(path).map_err(|e| {
                AppError::config(format!(
                    "Failed to open condition tables '{}': {e}",
                    path.display()
                ))
            })?;
            let tables: ConditionTables = serde_json::from_reader(file)
                .map_err(|e| AppError::config(format!("Invalid condition tables JSON: {e}")))?;
            tables
        }
        None => ConditionTables::reference(),
    };

    let exclusions = match &config.exclusions_path {
        Some(path) => ExclusionList::read_json(path)?,
        None => ExclusionList::default(),
    };

    let archive = read_archive(&config.archive_path)?;
    let groups = group_by_condition(&archive, &tables, &exclusions)?;

    let model = PseudoFirstOrder::new(FitOptions {
        robust: config.robust,
        robust_iters: config.robust_iters,
        robust_width: config.robust_width,
        clip_floor: config.clip_floor,
    });

    let output = analyze_groups(&groups, &tables, &model)?;
    Ok((output, tables))
}

/// Run the fitting stages over pre-grouped traces.
///
/// Split out from [`run_analysis`] so tests and alternative front-ends can
/// drive the pipeline without touching the filesystem.
pub fn analyze_groups(
    groups: &BTreeMap<ConditionKey, Vec<Trace>>,
    tables: &ConditionTables,
    model: &dyn KineticModel,
) -> Result<RunOutput, AppError> {
    let batch = fit_all_conditions(groups, model)?;

    let mut series = Vec::new();
    let mut skipped_series = Vec::new();

    for (&ionic_id, &ionic_strength) in &tables.ionic_strength {
        // Conditions come out of the batch in key order, so temperatures are
        // already sorted within one ionic strength.
        let mut temps: Vec<f64> = Vec::new();
        let mut rates: Vec<RateConstant> = Vec::new();
        for cond in batch.conditions.iter().filter(|c| c.key.ionic_id == ionic_id) {
            temps.push(tables.temperature_for(cond.key.temp_id)?);
            rates.push(cond.rate);
        }

        match fit_arrhenius(&temps, &rates) {
            Ok(fit) => series.push(IonicSeries {
                ionic_id,
                ionic_strength,
                fit,
            }),
            Err(e) => skipped_series.push((ionic_id, e.to_string())),
        }
    }

    if series.is_empty() {
        let detail = skipped_series
            .first()
            .map(|(id, reason)| format!(" First failure: I{id}: {reason}"))
            .unwrap_or_default();
        return Err(AppError::fit(format!(
            "No ionic strength produced an Arrhenius fit.{detail}"
        )));
    }

    Ok(RunOutput {
        batch,
        series,
        skipped_series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synth::{SynthSpec, generate_archive};
    use crate::fit::arrhenius::GAS_CONSTANT;

    /// End-to-end: 4 ionic strengths x 5 temperatures x 7 replicates of
    /// synthetic decay traces, k following a known Arrhenius law independent of
    /// ionic strength. Every series should recover the configured Ea.
    #[test]
    fn recovers_activation_energy_for_every_ionic_strength() {
        let spec = SynthSpec {
            noise_sigma: 0.002,
            ..SynthSpec::default()
        };
        let archive = generate_archive(&spec).unwrap();
        let groups = group_by_condition(
            &archive,
            &spec.tables,
            &ExclusionList::default(),
        )
        .unwrap();

        let model = PseudoFirstOrder::default();
        let output = analyze_groups(&groups, &spec.tables, &model).unwrap();

        assert!(output.batch.failed.is_empty());
        assert_eq!(output.batch.conditions.len(), 20);
        assert_eq!(output.series.len(), 4);
        assert!(output.skipped_series.is_empty());

        for s in &output.series {
            let rel = (s.fit.activation_energy - spec.activation_energy).abs()
                / spec.activation_energy;
            assert!(
                rel < 0.10,
                "I{}: expected Ea ~ {} J/mol, got {} (rel err {rel:.3})",
                s.ionic_id,
                spec.activation_energy,
                s.fit.activation_energy
            );
        }

        // Rate constants themselves should sit near the configured law.
        for cond in &output.batch.conditions {
            let temp = spec.tables.temperature_for(cond.key.temp_id).unwrap();
            let k_true = spec.rate_at(temp);
            let rel = (cond.rate.value - k_true).abs() / k_true;
            assert!(
                rel < 0.15,
                "{}: expected k ~ {k_true:.2}, got {:.2}",
                cond.key,
                cond.rate.value
            );
        }

        // Sanity: the law itself spans a reasonable rate range on this grid.
        let k_cold = spec.rate_at(288.15);
        let k_hot = spec.rate_at(308.15);
        let implied_ea =
            (k_hot / k_cold).ln() * GAS_CONSTANT / (1.0 / 288.15 - 1.0 / 308.15);
        assert!((implied_ea - spec.activation_energy).abs() < 1e-6);
    }

    /// `run_analysis` with every input coming off disk: a written archive,
    /// condition tables loaded from JSON, and a curated exclusion file.
    #[test]
    fn run_analysis_loads_tables_and_exclusions_from_disk() {
        use crate::domain::RobustKind;
        use crate::io::archive::{ExcludedReplicate, write_archive};

        let tables = ConditionTables {
            ionic_strength: BTreeMap::from([(0, 0.25)]),
            temperature_k: BTreeMap::from([(0, 288.15), (1, 298.15)]),
            replicates: 3,
        };
        let spec = SynthSpec {
            tables: tables.clone(),
            noise_sigma: 0.002,
            ..SynthSpec::default()
        };
        let archive = generate_archive(&spec).unwrap();

        let dir = std::env::temp_dir();
        let pid = std::process::id();
        let archive_path = dir.join(format!("sfk-pipeline-{pid}.json.gz"));
        let tables_path = dir.join(format!("sfk-tables-{pid}.json"));
        let exclusions_path = dir.join(format!("sfk-exclude-{pid}.json"));

        write_archive(&archive_path, &archive).unwrap();
        std::fs::write(&tables_path, serde_json::to_string(&tables).unwrap()).unwrap();
        let exclusions = ExclusionList {
            excluded: vec![ExcludedReplicate { ionic_id: 0, temp_id: 0, replicate_id: 2 }],
        };
        std::fs::write(&exclusions_path, serde_json::to_string(&exclusions).unwrap()).unwrap();

        let config = AnalysisConfig {
            archive_path: archive_path.clone(),
            tables_path: Some(tables_path.clone()),
            exclusions_path: Some(exclusions_path.clone()),
            robust: RobustKind::Gaussian,
            robust_iters: 4,
            robust_width: 2.5,
            clip_floor: 1e-6,
            export_rates: None,
            export_json: None,
        };
        let result = run_analysis(&config);
        for p in [&archive_path, &tables_path, &exclusions_path] {
            let _ = std::fs::remove_file(p);
        }
        let (output, loaded_tables) = result.unwrap();

        assert_eq!(loaded_tables.replicates, 3);
        assert_eq!(output.batch.conditions.len(), 2);
        assert_eq!(output.series.len(), 1);
        // The excluded replicate only thins out its own condition.
        for cond in &output.batch.conditions {
            let expected = if cond.key.temp_id == 0 { 2 } else { 3 };
            assert_eq!(cond.estimate.n_combined, expected, "{}", cond.key);
        }
    }

    #[test]
    fn single_temperature_grid_skips_series_and_errors() {
        // One temperature level: every Arrhenius regression is insufficient.
        let tables = ConditionTables {
            ionic_strength: std::collections::BTreeMap::from([(0, 0.1)]),
            temperature_k: std::collections::BTreeMap::from([(2, 298.15)]),
            replicates: 3,
        };
        let spec = SynthSpec {
            tables: tables.clone(),
            noise_sigma: 0.002,
            ..SynthSpec::default()
        };
        let archive = generate_archive(&spec).unwrap();
        let groups = group_by_condition(&archive, &tables, &ExclusionList::default()).unwrap();

        let model = PseudoFirstOrder::default();
        let err = analyze_groups(&groups, &tables, &model).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
