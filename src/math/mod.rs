//! Mathematical utilities: weighted straight-line regression and robust reweighting.

pub mod robust;
pub mod wls;

pub use robust::*;
pub use wls::*;
