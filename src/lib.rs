//! kb-tool - Knowledge-graph path sampling with negative tails.
//!
//! ## Architecture
//!
//! - **Graph**: tab-separated triples loaded into an in-memory graph whose
//!   edges can be walked in both directions
//! - **Sampler**: seeded random walks with Poisson-distributed lengths,
//!   paired with a uniform or near-miss negative tail
//! - **Pool**: parallel samplers over one shared graph
//!
//! ## Pipelines
//!
//! - **Cutoff**: Count → Vocabularies → Frequency-filtered `train.txt`
//! - **Paths**: Fixed-length path listings and the uniform / near-miss listing
//! - **Dataset**: Sample N paths with negatives → JSONL

pub mod graph;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod sampler;

// Re-exports for convenience
pub use graph::{KnowledgeGraph, Triple, TripleOrder};
pub use models::{Config, KbToolError, NegativeStrategy, PathSample, Result, RunStats};
pub use pipeline::{CutoffOptions, DatasetPipeline};
pub use pool::SamplerPool;
pub use sampler::PathSampler;
