//! Sample and result types for kb-tool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a negative tail is drawn for a sampled path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeStrategy {
    /// Any entity that is not a true tail
    Uniform,
    /// An entity from the range of the path's last relation
    #[default]
    NearMiss,
}

impl NegativeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::NearMiss => "near-miss",
        }
    }
}

impl fmt::Display for NegativeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sampled path paired with a negative tail.
///
/// `path` is `[head, label_1, …, label_n, tail]`. `negative` is empty when
/// no entity qualified as a negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSample {
    pub path: Vec<String>,
    pub negative: String,
}

impl PathSample {
    pub fn head(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or("")
    }

    pub fn tail(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// Directed relation labels between head and tail.
    pub fn relations(&self) -> &[String] {
        if self.path.len() < 2 {
            return &[];
        }
        &self.path[1..self.path.len() - 1]
    }

    /// Number of steps in the path.
    pub fn path_len(&self) -> usize {
        self.relations().len()
    }
}

impl fmt::Display for PathSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.path.join("\t"), self.negative)
    }
}

/// One line of a generated JSONL dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Unique identifier for this record
    pub id: String,

    /// Full path tokens
    pub path: Vec<String>,

    /// Start entity
    pub head: String,

    /// Directed relation labels
    pub relations: Vec<String>,

    /// True end entity
    pub tail: String,

    /// Negative end entity (empty if none qualified)
    pub negative: String,

    /// Strategy used for the negative
    pub strategy: NegativeStrategy,

    /// Number of steps
    pub path_len: usize,

    /// Worker that produced the record
    pub worker: usize,

    /// Generation timestamp
    pub generated_at: DateTime<Utc>,
}

impl DatasetRecord {
    pub fn from_sample(sample: PathSample, strategy: NegativeStrategy, worker: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            head: sample.head().to_string(),
            relations: sample.relations().to_vec(),
            tail: sample.tail().to_string(),
            path_len: sample.path_len(),
            negative: sample.negative,
            path: sample.path,
            strategy,
            worker,
            generated_at: Utc::now(),
        }
    }
}

/// Statistics for a dataset generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Records requested
    pub requested: usize,

    /// Records written
    pub written: usize,

    /// Records whose negative came back empty
    pub empty_negatives: usize,

    /// Workers used
    pub workers: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Records per second throughput
    pub throughput_per_sec: f64,

    /// Mean number of steps per path
    pub mean_path_len: f64,

    #[serde(skip)]
    pub(crate) total_steps: usize,
}

impl RunStats {
    pub fn new(requested: usize, workers: usize) -> Self {
        Self {
            requested,
            workers,
            ..Default::default()
        }
    }

    /// Account for one written record.
    pub fn record(&mut self, record: &DatasetRecord) {
        self.written += 1;
        self.total_steps += record.path_len;
        if record.negative.is_empty() {
            self.empty_negatives += 1;
        }
    }

    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.written > 0 {
            self.mean_path_len = self.total_steps as f64 / self.written as f64;
        }
        if self.runtime_secs > 0.0 {
            self.throughput_per_sec = self.written as f64 / self.runtime_secs;
        }
    }
}
