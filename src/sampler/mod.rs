//! Sampler module - path sampling and negative tail strategies.

mod negative;
mod path_sampler;

pub use negative::*;
pub use path_sampler::*;
