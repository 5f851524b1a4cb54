//! Graph module - triple parsing and the in-memory knowledge graph.

mod knowledge_graph;
mod triple;

pub use knowledge_graph::*;
pub use triple::*;
