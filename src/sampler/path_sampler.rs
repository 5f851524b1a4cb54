//! Seeded path sampler over a shared knowledge graph.

use crate::graph::{KnowledgeGraph, TripleOrder, Walk, load_triples};
use crate::models::{ConfigError, NegativeStrategy, PathSample, Result, SamplerConfig};
use crate::sampler::{NearMissNegative, NegativeSampler, UniformNegative};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Poisson};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Samples relation paths with Poisson-distributed lengths, optionally
/// paired with a negative tail.
#[derive(Debug)]
pub struct PathSampler {
    graph: Arc<KnowledgeGraph>,
    config: SamplerConfig,
    poisson: Poisson<f64>,
    rng: StdRng,
}

impl PathSampler {
    /// Load triples from `data_path` and build a sampler.
    ///
    /// `mean_path_len` drives the Poisson length distribution,
    /// `max_path_len` caps the number of steps and `random_state` seeds the
    /// generator.
    pub fn new(
        data_path: impl AsRef<Path>,
        mean_path_len: f64,
        max_path_len: usize,
        random_state: u64,
    ) -> Result<Self> {
        let config = SamplerConfig {
            mean_path_len,
            max_path_len,
            random_state,
            ..Default::default()
        };
        Self::from_file(data_path.as_ref(), TripleOrder::Hrt, config)
    }

    /// Build a sampler from a triples file with explicit settings.
    pub fn from_file(data_path: &Path, order: TripleOrder, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        let triples = load_triples(data_path, order)?;
        let graph = KnowledgeGraph::from_triples(triples);
        info!(
            triples = graph.triple_count(),
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            "Built knowledge graph"
        );
        Self::from_graph(Arc::new(graph), config)
    }

    /// Build a sampler over an already loaded graph.
    pub fn from_graph(graph: Arc<KnowledgeGraph>, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        let poisson = Poisson::new(config.mean_path_len).map_err(|e| ConfigError::Invalid {
            field: "sampler.mean_path_len",
            reason: e.to_string(),
        })?;
        let rng = StdRng::from_seed(seed_bytes(config.random_state));

        Ok(Self {
            graph,
            config,
            poisson,
            rng,
        })
    }

    /// Number of triples the graph was built from.
    pub fn data_size(&self) -> usize {
        self.graph.triple_count()
    }

    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Draw a path length: `min(poisson + 1, max_path_len)`.
    fn draw_path_len(&mut self) -> usize {
        let v: f64 = self.poisson.sample(&mut self.rng);
        ((v + 1.0) as usize).min(self.config.max_path_len)
    }

    fn draw_walk(&mut self) -> Result<Walk> {
        let path_len = self.draw_path_len();
        self.graph.sample_walk(path_len, &mut self.rng)
    }

    fn render(&self, walk: &Walk) -> Vec<String> {
        self.graph
            .render_walk(walk, &self.config.forward_suffix, &self.config.reverse_suffix)
    }

    /// Sample a path without a negative.
    pub fn sample_path(&mut self) -> Result<Vec<String>> {
        let walk = self.draw_walk()?;
        Ok(self.render(&walk))
    }

    /// Sample a path whose negative is any entity that is not a true tail.
    pub fn sample_path_with_negative_uniformly(&mut self) -> Result<PathSample> {
        self.sample_with(&UniformNegative)
    }

    /// Sample a path whose negative is a plausible but wrong tail for the
    /// last relation.
    pub fn sample_path_with_negative_near_miss(&mut self) -> Result<PathSample> {
        self.sample_with(&NearMissNegative)
    }

    pub fn sample_path_with_negative(&mut self, strategy: NegativeStrategy) -> Result<PathSample> {
        match strategy {
            NegativeStrategy::Uniform => self.sample_path_with_negative_uniformly(),
            NegativeStrategy::NearMiss => self.sample_path_with_negative_near_miss(),
        }
    }

    /// Sample a path and draw its negative with `negatives`.
    pub fn sample_with(&mut self, negatives: &dyn NegativeSampler) -> Result<PathSample> {
        let walk = self.draw_walk()?;

        let mut excluded = if self.config.exclude_reachable {
            self.graph.reachable(walk.start, &walk.steps)
        } else {
            HashSet::new()
        };
        excluded.insert(walk.end);

        let negative = negatives
            .sample_negative(&self.graph, &walk, &excluded, &mut self.rng)
            .map(|id| self.graph.entity(id).to_string())
            .unwrap_or_default();

        Ok(PathSample {
            path: self.render(&walk),
            negative,
        })
    }
}

/// 8 big-endian bytes of `random_state` followed by 24 zero bytes.
fn seed_bytes(random_state: u64) -> [u8; 32] {
    let mut seed = [0u8; 32];
    seed[..8].copy_from_slice(&random_state.to_be_bytes());
    seed
}
