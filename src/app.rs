//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the trace archive and condition tables
//! - runs per-trace fitting, aggregation, and Arrhenius regression
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, SynthArgs};
use crate::domain::AnalysisConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `sfk` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args, OutputMode::Full),
        Command::Rates(args) => handle_analyze(args, OutputMode::RatesOnly),
        Command::Synth(args) => handle_synth(args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    RatesOnly,
}

fn handle_analyze(args: AnalyzeArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let (output, tables) = pipeline::run_analysis(&config)?;

    match mode {
        OutputMode::Full => {
            println!("{}", crate::report::format_run_summary(&output, &tables));
        }
        OutputMode::RatesOnly => {
            println!("{}", crate::report::format_rate_table(&output, &tables));
        }
    }

    if let Some(path) = &config.export_rates {
        crate::io::export::write_rates_csv(path, &output, &tables)?;
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_analysis_json(path, &output, &tables)?;
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let spec = crate::data::synth::SynthSpec {
        tables: crate::domain::ConditionTables::reference(),
        pre_exponential: args.pre_exponential,
        activation_energy: args.activation_energy,
        amplitude: args.amplitude,
        plateau: args.plateau,
        noise_sigma: args.noise,
        n_samples: args.samples,
        decay_span: args.decay_span,
        seed: args.seed,
    };
    let archive = crate::data::synth::generate_archive(&spec)?;
    crate::io::archive::write_archive(&args.out, &archive)?;

    println!(
        "Wrote {} traces ({} conditions x {} replicates) to {}.",
        archive.entries.len(),
        spec.tables.grid().len(),
        spec.tables.replicates,
        args.out.display()
    );
    Ok(())
}

pub fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    AnalysisConfig {
        archive_path: args.archive.clone(),
        tables_path: args.tables.clone(),
        exclusions_path: args.exclude.clone(),
        robust: args.robust,
        robust_iters: args.robust_iters,
        robust_width: args.robust_width,
        clip_floor: args.clip_floor,
        export_rates: args.export.clone(),
        export_json: args.export_json.clone(),
    }
}
