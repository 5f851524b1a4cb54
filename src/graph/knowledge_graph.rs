//! In-memory knowledge graph with random-walk sampling.
//!
//! Entities are nodes, every triple is one directed labeled edge. Walks may
//! traverse an edge in either direction; the direction is recorded so the
//! rendered path can tell `r::-->` from `r::<--`.

use crate::graph::Triple;
use crate::models::{KbToolError, Result};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Direction an edge is traversed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// head to tail
    Forward,
    /// tail to head
    Reverse,
}

#[derive(Debug)]
struct Edge {
    src: usize,
    dst: usize,
    relation: usize,
}

#[derive(Debug)]
struct Node {
    label: String,
    edges_fwd: Vec<usize>,
    edges_rev: Vec<usize>,
}

impl Node {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            edges_fwd: Vec::new(),
            edges_rev: Vec::new(),
        }
    }
}

/// One traversed edge of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub relation: usize,
    pub direction: Direction,
}

/// A random walk: start entity, traversed relations, end entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub start: usize,
    pub steps: Vec<Step>,
    pub end: usize,
}

impl Walk {
    /// The last traversed relation, if any.
    pub fn last_step(&self) -> Option<Step> {
        self.steps.last().copied()
    }
}

#[derive(Debug)]
pub struct KnowledgeGraph {
    node_ids: HashMap<String, usize>,
    nodes: Vec<Node>,
    relation_ids: HashMap<String, usize>,
    relations: Vec<String>,
    edges: Vec<Edge>,
    /// Entities that appear as the target of each directed relation, sorted.
    ranges: HashMap<(usize, Direction), Vec<usize>>,
    triple_count: usize,
}

impl KnowledgeGraph {
    pub fn from_triples(triples: Vec<Triple>) -> Self {
        let mut graph = Self {
            node_ids: HashMap::new(),
            nodes: Vec::new(),
            relation_ids: HashMap::new(),
            relations: Vec::new(),
            edges: Vec::with_capacity(triples.len()),
            ranges: HashMap::new(),
            triple_count: triples.len(),
        };

        for tri in triples {
            let src = graph.intern_entity(tri.head);
            let dst = graph.intern_entity(tri.tail);
            let relation = graph.intern_relation(tri.relation);

            let edge_id = graph.edges.len();
            graph.nodes[src].edges_fwd.push(edge_id);
            graph.nodes[dst].edges_rev.push(edge_id);
            graph.edges.push(Edge { src, dst, relation });
        }

        let mut ranges: HashMap<(usize, Direction), HashSet<usize>> = HashMap::new();
        for edge in &graph.edges {
            ranges
                .entry((edge.relation, Direction::Forward))
                .or_default()
                .insert(edge.dst);
            ranges
                .entry((edge.relation, Direction::Reverse))
                .or_default()
                .insert(edge.src);
        }
        graph.ranges = ranges
            .into_iter()
            .map(|(key, set)| {
                let mut ids: Vec<usize> = set.into_iter().collect();
                ids.sort_unstable();
                (key, ids)
            })
            .collect();

        graph
    }

    fn intern_entity(&mut self, label: String) -> usize {
        if let Some(&id) = self.node_ids.get(&label) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(label.clone()));
        self.node_ids.insert(label, id);
        id
    }

    fn intern_relation(&mut self, label: String) -> usize {
        if let Some(&id) = self.relation_ids.get(&label) {
            return id;
        }
        let id = self.relations.len();
        self.relations.push(label.clone());
        self.relation_ids.insert(label, id);
        id
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of triples the graph was built from.
    pub fn triple_count(&self) -> usize {
        self.triple_count
    }

    pub fn entity(&self, id: usize) -> &str {
        &self.nodes[id].label
    }

    pub fn entity_id(&self, label: &str) -> Result<usize> {
        self.node_ids
            .get(label)
            .copied()
            .ok_or_else(|| KbToolError::UnknownEntity(label.to_string()))
    }

    pub fn relation(&self, id: usize) -> &str {
        &self.relations[id]
    }

    pub fn relation_id(&self, label: &str) -> Result<usize> {
        self.relation_ids
            .get(label)
            .copied()
            .ok_or_else(|| KbToolError::UnknownRelation(label.to_string()))
    }

    /// Entities that appear at the target end of `relation` traversed in `direction`.
    pub fn range(&self, relation: usize, direction: Direction) -> &[usize] {
        self.ranges
            .get(&(relation, direction))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sample a random walk of `path_len` steps from a uniformly chosen entity.
    pub fn sample_walk<R: Rng + ?Sized>(&self, path_len: usize, rng: &mut R) -> Result<Walk> {
        if self.is_empty() {
            return Err(KbToolError::EmptyGraph);
        }

        let start = rng.gen_range(0..self.nodes.len());
        let mut node = start;
        let mut prev_edge = None;
        let mut steps = Vec::with_capacity(path_len);

        for _ in 0..path_len {
            let (edge_id, direction) = self.select_edge(node, prev_edge, rng);
            let edge = &self.edges[edge_id];
            node = match direction {
                Direction::Forward => edge.dst,
                Direction::Reverse => edge.src,
            };
            prev_edge = Some(edge_id);
            steps.push(Step {
                relation: edge.relation,
                direction,
            });
        }

        Ok(Walk {
            start,
            steps,
            end: node,
        })
    }

    /// Pick an edge incident to `from` uniformly, avoiding `prev_edge`
    /// unless it is the only choice.
    fn select_edge<R: Rng + ?Sized>(
        &self,
        from: usize,
        prev_edge: Option<usize>,
        rng: &mut R,
    ) -> (usize, Direction) {
        let node = &self.nodes[from];
        let mut candidates: Vec<(usize, Direction)> = node
            .edges_fwd
            .iter()
            .map(|&e| (e, Direction::Forward))
            .chain(node.edges_rev.iter().map(|&e| (e, Direction::Reverse)))
            .collect();

        if let Some(prev) = prev_edge {
            if candidates.len() > 1 {
                if let Some(i) = candidates.iter().position(|&(e, _)| e == prev) {
                    candidates.remove(i);
                }
            }
        }

        // Every node comes from a triple, so it has at least one incident edge.
        candidates[rng.gen_range(0..candidates.len())]
    }

    /// Render a walk as `[head, label_1, …, label_n, tail]`.
    pub fn render_walk(&self, walk: &Walk, forward_suffix: &str, reverse_suffix: &str) -> Vec<String> {
        let mut path = Vec::with_capacity(walk.steps.len() + 2);
        path.push(self.entity(walk.start).to_string());
        for step in &walk.steps {
            let suffix = match step.direction {
                Direction::Forward => forward_suffix,
                Direction::Reverse => reverse_suffix,
            };
            path.push(format!("{}{}", self.relation(step.relation), suffix));
        }
        path.push(self.entity(walk.end).to_string());
        path
    }

    /// Sample a path of exactly `path_len` steps and render it.
    pub fn sample_path<R: Rng + ?Sized>(
        &self,
        path_len: usize,
        rng: &mut R,
        forward_suffix: &str,
        reverse_suffix: &str,
    ) -> Result<Vec<String>> {
        let walk = self.sample_walk(path_len, rng)?;
        Ok(self.render_walk(&walk, forward_suffix, reverse_suffix))
    }

    /// All entities reachable from `start` by following `steps` in order.
    pub fn reachable(&self, start: usize, steps: &[Step]) -> HashSet<usize> {
        let mut frontier: HashSet<usize> = HashSet::from([start]);

        for step in steps {
            let mut next = HashSet::new();
            for &n in &frontier {
                let node = &self.nodes[n];
                match step.direction {
                    Direction::Forward => next.extend(
                        node.edges_fwd
                            .iter()
                            .map(|&e| &self.edges[e])
                            .filter(|e| e.relation == step.relation)
                            .map(|e| e.dst),
                    ),
                    Direction::Reverse => next.extend(
                        node.edges_rev
                            .iter()
                            .map(|&e| &self.edges[e])
                            .filter(|e| e.relation == step.relation)
                            .map(|e| e.src),
                    ),
                }
            }
            if next.is_empty() {
                return next;
            }
            frontier = next;
        }

        frontier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn triangle() -> KnowledgeGraph {
        KnowledgeGraph::from_triples(vec![
            Triple::new("A", "r1", "B"),
            Triple::new("B", "r2", "C"),
            Triple::new("C", "r3", "A"),
        ])
    }

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

    #[test]
    fn test_counts() {
        let kg = countries();
        assert_eq!(kg.entity_count(), 8);
        assert_eq!(kg.relation_count(), 2);
        assert_eq!(kg.edge_count(), 6);
        assert_eq!(kg.triple_count(), 6);
        assert_eq!(kg.entity(kg.entity_id("paris").unwrap()), "paris");
        assert!(matches!(
            kg.entity_id("rome"),
            Err(KbToolError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_ranges() {
        let kg = countries();
        let capital_of = kg.relation_id("capital_of").unwrap();
        let fwd: Vec<&str> = kg
            .range(capital_of, Direction::Forward)
            .iter()
            .map(|&i| kg.entity(i))
            .collect();
        assert_eq!(fwd.len(), 3);
        assert!(fwd.contains(&"japan") && fwd.contains(&"france") && fwd.contains(&"germany"));

        let rev: Vec<&str> = kg
            .range(capital_of, Direction::Reverse)
            .iter()
            .map(|&i| kg.entity(i))
            .collect();
        assert_eq!(rev.len(), 3);
        assert!(rev.contains(&"tokyo"));
    }

    #[test]
    fn test_sample_path_shape_and_connectivity() {
        let kg = countries();
        let mut rng = StdRng::seed_from_u64(7);
        for len in 1..=4 {
            for _ in 0..50 {
                let walk = kg.sample_walk(len, &mut rng).unwrap();
                assert_eq!(walk.steps.len(), len);
                assert!(kg.reachable(walk.start, &walk.steps).contains(&walk.end));

                let path = kg.render_walk(&walk, "::-->", "::<--");
                assert_eq!(path.len(), len + 2);
                for label in &path[1..path.len() - 1] {
                    assert!(label.ends_with("::-->") || label.ends_with("::<--"));
                }
            }
        }
    }

    #[test]
    fn test_no_immediate_backtracking() {
        // On a triangle every node has two edges, so a walk never reuses
        // the edge it just came through.
        let kg = triangle();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let walk = kg.sample_walk(3, &mut rng).unwrap();
            for pair in walk.steps.windows(2) {
                assert_ne!(pair[0].relation, pair[1].relation);
            }
        }
    }

    #[test]
    fn test_dead_end_backtracks() {
        // A single edge forces the walk back the way it came.
        let kg = KnowledgeGraph::from_triples(vec![Triple::new("a", "r", "b")]);
        let mut rng = StdRng::seed_from_u64(3);
        let walk = kg.sample_walk(2, &mut rng).unwrap();
        assert_eq!(walk.start, walk.end);
        assert_ne!(walk.steps[0].direction, walk.steps[1].direction);
    }

    #[test]
    fn test_reachable_follows_directions() {
        let kg = countries();
        let capital_of = kg.relation_id("capital_of").unwrap();
        let located_in = kg.relation_id("located_in").unwrap();
        let paris = kg.entity_id("paris").unwrap();
        let europe = kg.entity_id("europe").unwrap();

        let reached = kg.reachable(
            paris,
            &[
                Step { relation: capital_of, direction: Direction::Forward },
                Step { relation: located_in, direction: Direction::Forward },
                Step { relation: located_in, direction: Direction::Reverse },
            ],
        );
        let labels: HashSet<&str> = reached.iter().map(|&i| kg.entity(i)).collect();
        assert_eq!(labels, HashSet::from(["france", "germany"]));

        let none = kg.reachable(
            europe,
            &[Step { relation: capital_of, direction: Direction::Forward }],
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_same_seed_same_paths() {
        let kg = countries();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(
                kg.sample_path(2, &mut a, ">", "<").unwrap(),
                kg.sample_path(2, &mut b, ">", "<").unwrap()
            );
        }
    }

    #[test]
    fn test_empty_graph() {
        let kg = KnowledgeGraph::from_triples(Vec::new());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            kg.sample_walk(1, &mut rng),
            Err(KbToolError::EmptyGraph)
        ));
    }
}
