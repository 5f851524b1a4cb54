//! Worker pool for parallel dataset generation.
//!
//! Records are generated in rounds. Within a round each worker owns its own
//! `PathSampler` over the shared graph, seeded with
//! `random_state + round * pool_size + worker`, and runs on the blocking
//! thread pool. Results are joined in worker order so a run is reproducible
//! for a fixed seed, size, pool size and round size.

use crate::graph::KnowledgeGraph;
use crate::models::{DatasetRecord, KbToolError, NegativeStrategy, Result, SamplerConfig};
use crate::sampler::{PathSampler, negative_sampler};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{debug, warn};

/// Pool of sampling workers sharing one knowledge graph.
pub struct SamplerPool {
    /// Graph shared read-only by all workers
    graph: Arc<KnowledgeGraph>,
    /// Base sampler settings
    config: SamplerConfig,
    /// Negative strategy for every record
    strategy: NegativeStrategy,
    /// Number of workers
    pool_size: usize,
}

impl SamplerPool {
    /// Create a new pool. A `pool_size` of zero is treated as one.
    pub fn new(
        graph: Arc<KnowledgeGraph>,
        config: SamplerConfig,
        strategy: NegativeStrategy,
        pool_size: usize,
    ) -> Self {
        Self {
            graph,
            config,
            strategy,
            pool_size: pool_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Split `total` records across workers, earlier workers taking the remainder.
    pub fn shares(total: usize, workers: usize) -> Vec<usize> {
        let workers = workers.max(1);
        let base = total / workers;
        let extra = total % workers;
        (0..workers)
            .map(|i| base + usize::from(i < extra))
            .collect()
    }

    /// Seed of `worker` in `round`.
    pub fn worker_seed(&self, round: usize, worker: usize) -> u64 {
        let offset = (round as u64)
            .wrapping_mul(self.pool_size as u64)
            .wrapping_add(worker as u64);
        self.config.random_state.wrapping_add(offset)
    }

    /// Generate round `round` of `total` records, one batch per worker, in worker order.
    pub async fn generate_batch(
        &self,
        round: usize,
        total: usize,
        progress: Option<ProgressBar>,
    ) -> Result<Vec<Vec<DatasetRecord>>> {
        let shares = Self::shares(total, self.pool_size);
        let mut handles = Vec::with_capacity(shares.len());

        for (worker, count) in shares.into_iter().enumerate() {
            let graph = Arc::clone(&self.graph);
            let config = SamplerConfig {
                random_state: self.worker_seed(round, worker),
                ..self.config.clone()
            };
            let strategy = self.strategy;
            let progress = progress.clone();

            let handle = tokio::task::spawn_blocking(move || {
                run_worker(worker, count, graph, config, strategy, progress)
            });
            handles.push(handle);
        }

        let mut batches = Vec::with_capacity(handles.len());
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(Ok(records)) => batches.push(records),
                Ok(Err(e)) => {
                    warn!(round = round, worker = worker, error = %e, "Worker failed");
                    return Err(e);
                }
                Err(e) => {
                    warn!(round = round, worker = worker, error = %e, "Worker panicked");
                    return Err(KbToolError::WorkerFailed {
                        worker,
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(batches)
    }
}

fn run_worker(
    worker: usize,
    count: usize,
    graph: Arc<KnowledgeGraph>,
    config: SamplerConfig,
    strategy: NegativeStrategy,
    progress: Option<ProgressBar>,
) -> Result<Vec<DatasetRecord>> {
    let mut sampler = PathSampler::from_graph(graph, config)?;
    let negatives = negative_sampler(strategy);
    let mut records = Vec::with_capacity(count);

    for _ in 0..count {
        let sample = sampler.sample_with(negatives.as_ref())?;
        records.push(DatasetRecord::from_sample(sample, strategy, worker));
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    debug!(worker = worker, records = records.len(), "Worker finished");
    Ok(records)
}
