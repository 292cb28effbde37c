//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - experimental condition identifiers and lookup tables (`ConditionKey`, `ConditionTables`)
//! - immutable absorbance traces (`Trace`)
//! - fit outputs (`TraceFit`, `AveragedEstimate`, `RateConstant`, `ArrheniusFit`)

pub mod types;

pub use types::*;
