//! Dataset generation pipeline.
//!
//! Pipeline flow:
//! Triples → Knowledge graph → Sampler pool (N workers) → JSONL records
//!
//! Each record is a sampled path with its true tail and one negative tail.
//! Output is written round by round.

use crate::graph::{KnowledgeGraph, load_triples};
use crate::models::{Config, DatasetRecord, KbToolError, Result, RunStats};
use crate::pool::SamplerPool;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline that writes path/negative records as JSONL.
pub struct DatasetPipeline {
    pool: SamplerPool,
    config: Config,
}

impl DatasetPipeline {
    /// Create a pipeline over an already built graph.
    pub fn new(config: Config, graph: Arc<KnowledgeGraph>) -> Result<Self> {
        config.validate()?;

        let pool = SamplerPool::new(
            graph,
            config.sampler.clone(),
            config.dataset.strategy,
            config.dataset.workers,
        );

        Ok(Self { pool, config })
    }

    /// Load triples from `data_path` and create a pipeline.
    pub fn from_file(config: Config, data_path: &Path) -> Result<Self> {
        let triples = load_triples(data_path, config.data.order)?;
        let graph = KnowledgeGraph::from_triples(triples);
        if graph.is_empty() {
            return Err(KbToolError::EmptyGraph);
        }

        info!(
            triples = graph.triple_count(),
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            "Built knowledge graph"
        );

        Self::new(config, Arc::new(graph))
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    }

    /// Records generated per round across all workers.
    pub fn round_size(&self) -> usize {
        self.pool.pool_size().saturating_mul(self.config.dataset.chunk_size)
    }

    /// Generate the dataset and write it to `output_path`.
    ///
    /// Records are produced in rounds of [`round_size`](Self::round_size);
    /// each round is written and flushed before the next one is sampled, so
    /// a failing worker only loses the round in flight.
    pub async fn run(&self, output_path: &Path) -> Result<RunStats> {
        let start = Instant::now();
        let total = self.config.dataset.size;
        if total == 0 {
            return Err(KbToolError::InvalidInput(
                "dataset size must be at least 1".to_string(),
            ));
        }
        let round_size = self.round_size();

        info!(
            size = total,
            workers = self.pool.pool_size(),
            round_size = round_size,
            strategy = %self.config.dataset.strategy,
            max_path_len = self.config.sampler.max_path_len,
            "Starting dataset pipeline"
        );

        let output_file =
            File::create(output_path).map_err(|e| KbToolError::io("creating output file", e))?;
        let mut writer = BufWriter::new(output_file);

        let pb = self.progress_bar(total);
        let mut stats = RunStats::new(total, self.pool.pool_size());
        let mut round = 0;

        while stats.written < total {
            let count = round_size.min(total - stats.written);
            let batches = self
                .pool
                .generate_batch(round, count, Some(pb.clone()))
                .await?;

            for record in batches.iter().flatten() {
                write_record(&mut writer, record)?;
                stats.record(record);
            }
            writer
                .flush()
                .map_err(|e| KbToolError::io("flushing output", e))?;

            debug!(round = round, written = stats.written, "Round written");
            round += 1;
        }

        pb.finish_with_message(format!(
            "Done! {} records, {} without negative",
            stats.written, stats.empty_negatives
        ));

        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();

        info!(
            written = stats.written,
            rounds = round,
            empty_negatives = stats.empty_negatives,
            mean_path_len = format!("{:.2}", stats.mean_path_len),
            throughput = format!("{:.0} records/s", stats.throughput_per_sec),
            "Dataset pipeline complete"
        );

        Ok(stats)
    }
}

fn write_record<W: Write>(writer: &mut W, record: &DatasetRecord) -> Result<()> {
    let json = serde_json::to_string(record)
        .map_err(|e| KbToolError::Internal(format!("Failed to serialize record: {e}")))?;
    writeln!(writer, "{json}").map_err(|e| KbToolError::io("writing output", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NegativeStrategy;
    use std::fs;
    use tempfile::TempDir;

    const DATA: &str = "tokyo\tcapital_of\tjapan
paris\tcapital_of\tfrance
berlin\tcapital_of\tgermany
japan\tlocated_in\tasia
france\tlocated_in\teurope
germany\tlocated_in\teurope
";

    fn config(size: usize, workers: usize) -> Config {
        let mut config = Config::default();
        config.dataset.size = size;
        config.dataset.workers = workers;
        config.dataset.chunk_size = 4;
        config.dataset.strategy = NegativeStrategy::NearMiss;
        config.sampler.max_path_len = 2;
        config
    }

    #[tokio::test]
    async fn test_run_writes_jsonl() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("train.txt");
        let output = dir.path().join("dataset.jsonl");
        fs::write(&data, DATA).unwrap();

        let pipeline = DatasetPipeline::from_file(config(25, 3), &data).unwrap();
        let stats = pipeline.run(&output).await.unwrap();
        assert_eq!(stats.requested, 25);
        assert_eq!(stats.written, 25);
        assert_eq!(stats.workers, 3);

        let content = fs::read_to_string(&output).unwrap();
        let records: Vec<DatasetRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 25);
        for r in &records {
            assert_eq!(r.path.len(), r.path_len + 2);
            assert!(r.path_len >= 1 && r.path_len <= 2);
            assert_eq!(r.path.first(), Some(&r.head));
            assert_eq!(r.path.last(), Some(&r.tail));
            assert_ne!(r.negative, r.tail);
            assert_eq!(r.strategy, NegativeStrategy::NearMiss);
        }
    }

    #[tokio::test]
    async fn test_run_is_reproducible() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("train.txt");
        fs::write(&data, DATA).unwrap();

        let mut outputs = Vec::new();
        for name in ["a.jsonl", "b.jsonl"] {
            let output = dir.path().join(name);
            let pipeline = DatasetPipeline::from_file(config(12, 2), &data).unwrap();
            pipeline.run(&output).await.unwrap();
            let records: Vec<(Vec<String>, String)> = fs::read_to_string(&output)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str::<DatasetRecord>(l).unwrap())
                .map(|r| (r.path, r.negative))
                .collect();
            outputs.push(records);
        }
        assert_eq!(outputs[0], outputs[1]);
    }

    fn read_records(path: &Path) -> Vec<DatasetRecord> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_run_spans_several_rounds() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("train.txt");
        let output = dir.path().join("dataset.jsonl");
        fs::write(&data, DATA).unwrap();

        // 2 workers x 4 records per round: rounds of 8, 8 and 3
        let pipeline = DatasetPipeline::from_file(config(19, 2), &data).unwrap();
        assert_eq!(pipeline.round_size(), 8);
        let stats = pipeline.run(&output).await.unwrap();
        assert_eq!(stats.written, 19);

        let records = read_records(&output);
        assert_eq!(records.len(), 19);
        let workers: Vec<usize> = records.iter().map(|r| r.worker).collect();
        assert_eq!(
            workers,
            vec![0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 0, 0, 1, 1, 1, 1, 0, 0, 1]
        );
    }

    #[tokio::test]
    async fn test_round_size_does_not_change_first_round() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("train.txt");
        fs::write(&data, DATA).unwrap();

        // With one worker, the first round of a chunked run is a prefix of an
        // unchunked run over the same seed.
        let chunked_out = dir.path().join("chunked.jsonl");
        let chunked = DatasetPipeline::from_file(config(10, 1), &data).unwrap();
        chunked.run(&chunked_out).await.unwrap();

        let mut whole = config(10, 1);
        whole.dataset.chunk_size = 100;
        let whole_out = dir.path().join("whole.jsonl");
        DatasetPipeline::from_file(whole, &data)
            .unwrap()
            .run(&whole_out)
            .await
            .unwrap();

        let key = |r: &DatasetRecord| (r.path.clone(), r.negative.clone());
        let chunked: Vec<_> = read_records(&chunked_out).iter().map(key).collect();
        let whole: Vec<_> = read_records(&whole_out).iter().map(key).collect();
        assert_eq!(chunked.len(), 10);
        assert_eq!(whole.len(), 10);
        assert_eq!(chunked[..4], whole[..4]);
    }

    #[tokio::test]
    async fn test_zero_size_is_invalid_input() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("train.txt");
        let output = dir.path().join("dataset.jsonl");
        fs::write(&data, DATA).unwrap();

        let pipeline = DatasetPipeline::from_file(config(0, 2), &data).unwrap();
        assert!(matches!(
            pipeline.run(&output).await,
            Err(KbToolError::InvalidInput(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_data_rejected() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("empty.txt");
        fs::write(&data, "\n").unwrap();
        assert!(matches!(
            DatasetPipeline::from_file(config(1, 1), &data),
            Err(KbToolError::EmptyGraph)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let graph = Arc::new(KnowledgeGraph::from_triples(Vec::new()));
        let mut cfg = config(1, 1);
        cfg.dataset.workers = 0;
        assert!(matches!(
            DatasetPipeline::new(cfg, graph),
            Err(KbToolError::Config(_))
        ));
    }
}
