//! Frequency cutoff for knowledge-graph training data.
//!
//! Counts entity and relation occurrences, writes the vocabularies and a
//! filtered `train.txt` that only keeps triples whose entities and relation
//! all meet the minimum counts.

use crate::graph::Triple;
use crate::models::{KbToolError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Options for [`cutoff_at_frequency`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoffOptions {
    /// Minimum count of entities
    pub min_ent: usize,
    /// Minimum count of relations
    pub min_rel: usize,
    /// Drop duplicated triples before counting
    pub dedup_before_count: bool,
    /// Drop duplicated triples after counting
    pub dedup_after_count: bool,
}

impl Default for CutoffOptions {
    fn default() -> Self {
        Self {
            min_ent: 1,
            min_rel: 1,
            dedup_before_count: false,
            dedup_after_count: false,
        }
    }
}

/// Outcome of a cutoff run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CutoffStats {
    pub triples_in: usize,
    pub triples_out: usize,
    pub entities_kept: usize,
    pub relations_kept: usize,
}

/// Labels ordered by count descending, ties broken by label.
fn most_common<'a>(counts: &HashMap<&'a str, usize>) -> Vec<(&'a str, usize)> {
    let mut entries: Vec<(&str, usize)> = counts.iter().map(|(&k, &c)| (k, c)).collect();
    entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

fn write_vocab(path: &Path, entries: &[(&str, usize)], min_count: usize) -> Result<usize> {
    let file = File::create(path)
        .map_err(|e| KbToolError::io(format!("creating {}", path.display()), e))?;
    let mut out = BufWriter::new(file);
    let mut written = 0;

    for &(label, count) in entries {
        if count < min_count {
            break;
        }
        writeln!(out, "{}\t{:.1}", label, count as f64)
            .map_err(|e| KbToolError::io("writing vocabulary", e))?;
        written += 1;
    }

    out.flush()
        .map_err(|e| KbToolError::io("flushing vocabulary", e))?;
    Ok(written)
}

/// Write `entity.vocab`, `relation.vocab` and `train.txt` into `outdir`.
pub fn cutoff_at_frequency(
    mut triples: Vec<Triple>,
    outdir: &Path,
    options: &CutoffOptions,
) -> Result<CutoffStats> {
    let triples_in = triples.len();

    if options.dedup_before_count {
        triples.sort_unstable();
        triples.dedup();
    }

    let mut ents: HashMap<&str, usize> = HashMap::new();
    let mut rels: HashMap<&str, usize> = HashMap::new();
    for t in &triples {
        *ents.entry(t.head.as_str()).or_default() += 1;
        *ents.entry(t.tail.as_str()).or_default() += 1;
        *rels.entry(t.relation.as_str()).or_default() += 1;
    }

    std::fs::create_dir_all(outdir)
        .map_err(|e| KbToolError::io(format!("creating {}", outdir.display()), e))?;

    let entities_kept = write_vocab(
        &outdir.join("entity.vocab"),
        &most_common(&ents),
        options.min_ent,
    )?;
    let relations_kept = write_vocab(
        &outdir.join("relation.vocab"),
        &most_common(&rels),
        options.min_rel,
    )?;

    let keep = |t: &Triple| {
        ents[t.head.as_str()] >= options.min_ent
            && ents[t.tail.as_str()] >= options.min_ent
            && rels[t.relation.as_str()] >= options.min_rel
    };
    let mut kept: Vec<&Triple> = triples.iter().filter(|&t| keep(t)).collect();

    if options.dedup_after_count {
        kept.sort_unstable();
        kept.dedup();
    }

    let train_path = outdir.join("train.txt");
    let file = File::create(&train_path)
        .map_err(|e| KbToolError::io(format!("creating {}", train_path.display()), e))?;
    let mut out = BufWriter::new(file);
    for t in &kept {
        writeln!(out, "{}\t{}\t{}", t.head, t.relation, t.tail)
            .map_err(|e| KbToolError::io("writing train.txt", e))?;
    }
    out.flush()
        .map_err(|e| KbToolError::io("flushing train.txt", e))?;

    let stats = CutoffStats {
        triples_in,
        triples_out: kept.len(),
        entities_kept,
        relations_kept,
    };

    info!(
        triples_in = stats.triples_in,
        triples_out = stats.triples_out,
        entities = stats.entities_kept,
        relations = stats.relations_kept,
        "Cutoff complete"
    );

    Ok(stats)
}
