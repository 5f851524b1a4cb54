//! Triple parsing.

use crate::models::{KbToolError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A single `(head, relation, tail)` fact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub head: String,
    pub relation: String,
    pub tail: String,
}

impl Triple {
    pub fn new(
        head: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
    ) -> Self {
        Self {
            head: head.into(),
            relation: relation.into(),
            tail: tail.into(),
        }
    }
}

/// Column order of a tab-separated triples file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TripleOrder {
    /// head, relation, tail
    #[default]
    Hrt,
    /// head, tail, relation
    Htr,
}

/// Parse tab-separated triples.
///
/// Blank lines are skipped and columns past the third are ignored.
pub fn read_triples(content: &str, order: TripleOrder) -> Result<Vec<Triple>> {
    let mut triples = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 3 {
            return Err(KbToolError::parse(
                line_num + 1,
                format!("expected 3 tab-separated columns, found {}", cols.len()),
            ));
        }

        let triple = match order {
            TripleOrder::Hrt => Triple::new(cols[0], cols[1], cols[2]),
            TripleOrder::Htr => Triple::new(cols[0], cols[2], cols[1]),
        };
        triples.push(triple);
    }

    Ok(triples)
}

/// Read and parse a triples file.
pub fn load_triples(path: &Path, order: TripleOrder) -> Result<Vec<Triple>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| KbToolError::io(format!("reading triples from {}", path.display()), e))?;
    let triples = read_triples(&content, order)?;
    debug!(count = triples.len(), path = %path.display(), "Loaded triples");
    Ok(triples)
}
