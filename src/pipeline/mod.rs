//! Pipeline module - frequency cutoff, path listings and dataset generation.

mod cutoff;
mod dataset;
mod paths;

pub use cutoff::*;
pub use dataset::*;
pub use paths::*;
