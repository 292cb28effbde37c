//! Input/output helpers.
//!
//! - gzipped trace archive read/write + condition grouping (`archive`)
//! - result exports (CSV/JSON) (`export`)

pub mod archive;
pub mod export;

pub use archive::*;
pub use export::*;
