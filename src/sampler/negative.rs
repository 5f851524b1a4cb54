//! Negative tail strategies.
//!
//! A negative is an entity that does NOT complete the sampled path. The
//! caller passes the set of entities that must not be returned (the true
//! tail, and optionally every entity reachable along the path).

use crate::graph::{KnowledgeGraph, Walk};
use crate::models::NegativeStrategy;
use rand::{Rng, RngCore};
use std::collections::HashSet;

/// Strategy for drawing a negative tail.
pub trait NegativeSampler: Send + Sync {
    /// Draw a negative entity id, or `None` if no entity qualifies.
    fn sample_negative(
        &self,
        graph: &KnowledgeGraph,
        walk: &Walk,
        excluded: &HashSet<usize>,
        rng: &mut dyn RngCore,
    ) -> Option<usize>;

    /// The strategy this sampler implements.
    fn strategy(&self) -> NegativeStrategy;
}

/// Any non-excluded entity, uniformly.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformNegative;

impl NegativeSampler for UniformNegative {
    fn sample_negative(
        &self,
        graph: &KnowledgeGraph,
        _walk: &Walk,
        excluded: &HashSet<usize>,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        sample_excluding(graph.entity_count(), excluded, rng)
    }

    fn strategy(&self) -> NegativeStrategy {
        NegativeStrategy::Uniform
    }
}

/// A non-excluded entity from the range of the path's last relation.
///
/// Falls back to [`UniformNegative`] when the filtered range is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearMissNegative;

impl NegativeSampler for NearMissNegative {
    fn sample_negative(
        &self,
        graph: &KnowledgeGraph,
        walk: &Walk,
        excluded: &HashSet<usize>,
        rng: &mut dyn RngCore,
    ) -> Option<usize> {
        if let Some(step) = walk.last_step() {
            let candidates: Vec<usize> = graph
                .range(step.relation, step.direction)
                .iter()
                .copied()
                .filter(|id| !excluded.contains(id))
                .collect();
            if !candidates.is_empty() {
                return Some(candidates[rng.gen_range(0..candidates.len())]);
            }
        }

        UniformNegative.sample_negative(graph, walk, excluded, rng)
    }

    fn strategy(&self) -> NegativeStrategy {
        NegativeStrategy::NearMiss
    }
}

/// Build the sampler for a strategy.
pub fn negative_sampler(strategy: NegativeStrategy) -> Box<dyn NegativeSampler> {
    match strategy {
        NegativeStrategy::Uniform => Box::new(UniformNegative),
        NegativeStrategy::NearMiss => Box::new(NearMissNegative),
    }
}

/// Uniform draw from `0..n` minus `excluded`.
fn sample_excluding(n: usize, excluded: &HashSet<usize>, rng: &mut dyn RngCore) -> Option<usize> {
    let excluded_in_range = excluded.iter().filter(|&&id| id < n).count();
    if excluded_in_range >= n {
        return None;
    }

    // Rejection is cheap while most ids are allowed.
    if excluded_in_range * 2 < n {
        loop {
            let id = rng.gen_range(0..n);
            if !excluded.contains(&id) {
                return Some(id);
            }
        }
    }

    let allowed: Vec<usize> = (0..n).filter(|id| !excluded.contains(id)).collect();
    Some(allowed[rng.gen_range(0..allowed.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Triple;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn countries() -> KnowledgeGraph {
        KnowledgeGraph::from_triples(vec![
            Triple::new("tokyo", "capital_of", "japan"),
            Triple::new("paris", "capital_of", "france"),
            Triple::new("berlin", "capital_of", "germany"),
            Triple::new("japan", "located_in", "asia"),
            Triple::new("france", "located_in", "europe"),
            Triple::new("germany", "located_in", "europe"),
        ])
    }

    fn walk_from(kg: &KnowledgeGraph, start: &str, relation: &str, end: &str) -> Walk {
        Walk {
            start: kg.entity_id(start).unwrap(),
            steps: vec![crate::graph::Step {
                relation: kg.relation_id(relation).unwrap(),
                direction: crate::graph::Direction::Forward,
            }],
            end: kg.entity_id(end).unwrap(),
        }
    }

    #[test]
    fn test_uniform_never_returns_excluded() {
        let kg = countries();
        let walk = walk_from(&kg, "tokyo", "capital_of", "japan");
        let excluded = HashSet::from([walk.end]);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let neg = UniformNegative
                .sample_negative(&kg, &walk, &excluded, &mut rng)
                .unwrap();
            assert_ne!(neg, walk.end);
        }
    }

    #[test]
    fn test_near_miss_stays_in_range() {
        let kg = countries();
        let walk = walk_from(&kg, "tokyo", "capital_of", "japan");
        let excluded = HashSet::from([walk.end]);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let neg = NearMissNegative
                .sample_negative(&kg, &walk, &excluded, &mut rng)
                .unwrap();
            seen.insert(kg.entity(neg).to_string());
        }
        let expected: HashSet<String> = ["france", "germany"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_near_miss_falls_back_to_uniform() {
        // `located_in` has range {asia, europe}; excluding both forces the fallback.
        let kg = countries();
        let walk = walk_from(&kg, "japan", "located_in", "asia");
        let excluded = HashSet::from([kg.entity_id("asia").unwrap(), kg.entity_id("europe").unwrap()]);
        let mut rng = StdRng::seed_from_u64(5);
        let neg = NearMissNegative
            .sample_negative(&kg, &walk, &excluded, &mut rng)
            .unwrap();
        assert!(!excluded.contains(&neg));
    }

    #[test]
    fn test_everything_excluded() {
        let kg = KnowledgeGraph::from_triples(vec![Triple::new("a", "r", "b")]);
        let walk = walk_from(&kg, "a", "r", "b");
        let excluded: HashSet<usize> = (0..kg.entity_count()).collect();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(UniformNegative
            .sample_negative(&kg, &walk, &excluded, &mut rng)
            .is_none());
        assert!(NearMissNegative
            .sample_negative(&kg, &walk, &excluded, &mut rng)
            .is_none());
    }

    #[test]
    fn test_sample_excluding_dense_exclusion() {
        let excluded: HashSet<usize> = (0..9).collect();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..10 {
            assert_eq!(sample_excluding(10, &excluded, &mut rng), Some(9));
        }
    }

    #[test]
    fn test_factory() {
        assert_eq!(
            negative_sampler(NegativeStrategy::Uniform).strategy(),
            NegativeStrategy::Uniform
        );
        assert_eq!(
            negative_sampler(NegativeStrategy::NearMiss).strategy(),
            NegativeStrategy::NearMiss
        );
    }
}
