//! Kinetic fitting orchestration.
//!
//! Responsibilities:
//!
//! - fit a linearized first-order decay model per trace (`kinetic`)
//! - combine replicate fits per condition by inverse-covariance weighting (`aggregate`)
//! - regress ln(k) against 1/T per ionic strength (`arrhenius`)

pub mod aggregate;
pub mod arrhenius;
pub mod kinetic;

pub use aggregate::*;
pub use arrhenius::*;
pub use kinetic::*;
