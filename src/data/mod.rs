//! Synthetic data generation for demos and validation.

pub mod synth;

pub use synth::*;
