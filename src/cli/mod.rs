//! Command-line parsing for the stopped-flow kinetics analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::RobustKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sfk", version, about = "Stopped-flow kinetics analyzer (Fe3+ + SCN- -> FeSCN2+)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full analysis on a trace archive and print a summary report.
    Analyze(AnalyzeArgs),
    /// Print per-condition rate constants only (useful for scripting).
    Rates(AnalyzeArgs),
    /// Generate a synthetic trace archive from a known Arrhenius law.
    Synth(SynthArgs),
}

/// Common options for analysis and rate listing.
#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// Gzipped JSON trace archive.
    pub archive: PathBuf,

    /// Condition tables JSON (ionic-strength/temperature lookups + replicate count).
    /// The built-in reference scenario is used when omitted.
    #[arg(long)]
    pub tables: Option<PathBuf>,

    /// Curated replicate exclusion list JSON.
    #[arg(long)]
    pub exclude: Option<PathBuf>,

    /// Robust fitting mode for single traces.
    #[arg(long, value_enum, default_value_t = RobustKind::Gaussian)]
    pub robust: RobustKind,

    /// Number of IRLS reweight iterations.
    #[arg(long, default_value_t = 4)]
    pub robust_iters: usize,

    /// Gaussian kernel width (MAD units).
    #[arg(long, default_value_t = 2.5)]
    pub robust_width: f64,

    /// Lower clip bound for the log transform.
    #[arg(long, default_value_t = 1e-6)]
    pub clip_floor: f64,

    /// Export per-condition rate constants to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the full analysis (rates + Arrhenius fits) to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for synthetic archive generation.
#[derive(Debug, Parser)]
pub struct SynthArgs {
    /// Output path for the gzipped JSON archive.
    pub out: PathBuf,

    /// Arrhenius pre-exponential factor A (1/s).
    #[arg(long, default_value_t = 8.7e9)]
    pub pre_exponential: f64,

    /// Activation energy Ea (J/mol).
    #[arg(long, default_value_t = 50_000.0)]
    pub activation_energy: f64,

    /// Absorbance rise amplitude.
    #[arg(long, default_value_t = 0.45)]
    pub amplitude: f64,

    /// Steady-state absorbance.
    #[arg(long, default_value_t = 0.55)]
    pub plateau: f64,

    /// Gaussian noise standard deviation on absorbance.
    #[arg(long, default_value_t = 0.003)]
    pub noise: f64,

    /// Samples per trace.
    #[arg(long, default_value_t = 200)]
    pub samples: usize,

    /// E-foldings of decay recorded per trace.
    #[arg(long, default_value_t = 8.0)]
    pub decay_span: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}
