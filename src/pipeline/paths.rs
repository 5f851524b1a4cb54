//! Fixed-length path sampling and the uniform / near-miss negatives listing.

use crate::graph::{KnowledgeGraph, TripleOrder};
use crate::models::{KbToolError, Result, SamplerConfig};
use crate::sampler::PathSampler;
use rand::Rng;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Line printed between the uniform and near-miss blocks.
pub const SEPARATOR: &str = "---";

/// Sample `sample_size` paths of exactly `path_len` steps.
///
/// With `dedup` the result is sorted and duplicates are dropped.
pub fn sample_paths<R: Rng + ?Sized>(
    graph: &KnowledgeGraph,
    path_len: usize,
    sample_size: usize,
    dedup: bool,
    config: &SamplerConfig,
    rng: &mut R,
) -> Result<Vec<Vec<String>>> {
    let mut paths = (0..sample_size)
        .map(|_| graph.sample_path(path_len, &mut *rng, &config.forward_suffix, &config.reverse_suffix))
        .collect::<Result<Vec<_>>>()?;

    if dedup {
        paths.sort_unstable();
        paths.dedup();
    }

    Ok(paths)
}

/// Write one tab-joined path per line.
pub fn write_paths<W: Write>(paths: &[Vec<String>], out: &mut W) -> Result<()> {
    for path in paths {
        writeln!(out, "{}", path.join("\t")).map_err(|e| KbToolError::io("writing paths", e))?;
    }
    out.flush().map_err(|e| KbToolError::io("flushing paths", e))
}

/// Print `count` uniform samples, the separator, then `count` near-miss
/// samples drawn by a freshly seeded sampler.
pub fn write_negatives<W: Write>(
    data_path: &Path,
    order: TripleOrder,
    config: &SamplerConfig,
    count: usize,
    out: &mut W,
) -> Result<()> {
    let first = PathSampler::from_file(data_path, order, config.clone())?;
    let graph = Arc::clone(first.graph());
    info!(data_size = first.data_size(), count = count, "Sampling negatives");

    let mut sampler = first;
    for _ in 0..count {
        let sample = sampler.sample_path_with_negative_uniformly()?;
        writeln!(out, "{sample}").map_err(|e| KbToolError::io("writing samples", e))?;
    }

    writeln!(out, "{SEPARATOR}").map_err(|e| KbToolError::io("writing samples", e))?;

    let mut sampler = PathSampler::from_graph(graph, config.clone())?;
    for _ in 0..count {
        let sample = sampler.sample_path_with_negative_near_miss()?;
        writeln!(out, "{sample}").map_err(|e| KbToolError::io("writing samples", e))?;
    }

    out.flush().map_err(|e| KbToolError::io("flushing samples", e))
}
