//! Configuration models for kb-tool.
//!
//! Every tunable of the sampler and the dataset pipeline lives here.
//! Values come from an optional TOML file and may be overridden on the
//! command line.

use crate::graph::TripleOrder;
use crate::models::NegativeStrategy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for kb-tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input data settings
    #[serde(default)]
    pub data: DataConfig,

    /// Path sampler settings
    #[serde(default)]
    pub sampler: SamplerConfig,

    /// Dataset generation settings
    #[serde(default)]
    pub dataset: DatasetConfig,
}

/// Input data configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// Column order of the triples file
    #[serde(default)]
    pub order: TripleOrder,
}

/// Path sampler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SamplerConfig {
    /// Mean of the Poisson distribution that drives path lengths
    #[serde(default = "default_mean_path_len")]
    pub mean_path_len: f64,

    /// Upper bound on the number of steps in a path
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,

    /// Seed for the sampler's random number generator
    #[serde(default = "default_random_state")]
    pub random_state: u64,

    /// Suffix appended to a relation traversed head to tail
    #[serde(default = "default_forward_suffix")]
    pub forward_suffix: String,

    /// Suffix appended to a relation traversed tail to head
    #[serde(default = "default_reverse_suffix")]
    pub reverse_suffix: String,

    /// Exclude entities reachable from the head along the path from negatives
    #[serde(default = "default_true")]
    pub exclude_reachable: bool,
}

fn default_mean_path_len() -> f64 {
    1.5
}

fn default_max_path_len() -> usize {
    1
}

fn default_random_state() -> u64 {
    810
}

fn default_forward_suffix() -> String {
    "::-->".to_string()
}

fn default_reverse_suffix() -> String {
    "::<--".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            mean_path_len: default_mean_path_len(),
            max_path_len: default_max_path_len(),
            random_state: default_random_state(),
            forward_suffix: default_forward_suffix(),
            reverse_suffix: default_reverse_suffix(),
            exclude_reachable: default_true(),
        }
    }
}

impl SamplerConfig {
    /// Check sampler parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mean_path_len.is_finite() || self.mean_path_len <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "sampler.mean_path_len",
                reason: format!("must be a positive number, got {}", self.mean_path_len),
            });
        }
        if self.max_path_len == 0 {
            return Err(ConfigError::Invalid {
                field: "sampler.max_path_len",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.forward_suffix.is_empty() || self.reverse_suffix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sampler.forward_suffix",
                reason: "edge suffixes must not be empty".to_string(),
            });
        }
        if self.forward_suffix == self.reverse_suffix {
            return Err(ConfigError::Invalid {
                field: "sampler.reverse_suffix",
                reason: "must differ from forward_suffix".to_string(),
            });
        }
        Ok(())
    }
}

/// Dataset generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Number of records to generate
    #[serde(default = "default_size")]
    pub size: usize,

    /// Number of parallel sampling workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Records each worker generates per round; a round is written and flushed
    /// before the next one starts
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// How negatives are drawn
    #[serde(default)]
    pub strategy: NegativeStrategy,

    /// Output file path
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_size() -> usize {
    1000
}

fn default_workers() -> usize {
    4
}

fn default_chunk_size() -> usize {
    256
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            workers: default_workers(),
            chunk_size: default_chunk_size(),
            strategy: NegativeStrategy::default(),
            output: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Load from `path` if given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sampler.validate()?;
        if self.dataset.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "dataset.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.dataset.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                field: "dataset.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
