//! Core data models for kb-tool.
//!
//! - Configuration (TOML-backed, CLI-overridable)
//! - Error taxonomy
//! - Sampled paths and dataset records

mod config;
mod error;
mod sample;

pub use config::*;
pub use error::*;
pub use sample::*;
