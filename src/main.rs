//! kb-tool CLI - Knowledge-graph path sampling with negative tails.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kb_tool::graph::load_triples;
use kb_tool::pipeline::{cutoff_at_frequency, sample_paths, write_negatives, write_paths};
use kb_tool::{
    Config, CutoffOptions, DatasetPipeline, KnowledgeGraph, NegativeStrategy, TripleOrder,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{BufWriter, stdout};
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "kb-tool")]
#[command(version)]
#[command(about = "Knowledge-graph path sampling with uniform and near-miss negatives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Column order of the triples file
    #[arg(long, global = true, value_enum)]
    order: Option<TripleOrder>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print uniform negatives, a `---` separator, then near-miss negatives
    Negatives {
        /// Triples file to sample from
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Mean of the Poisson path length distribution
        #[arg(long)]
        mean_path_len: Option<f64>,

        /// Maximum number of steps in a path
        #[arg(long)]
        max_path_len: Option<usize>,

        /// Random seed
        #[arg(long)]
        random_state: Option<u64>,

        /// Samples printed per strategy
        #[arg(long, default_value = "10")]
        count: usize,
    },

    /// Sample fixed-length paths
    SamplePath {
        /// Sampling source
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Length of a path
        #[arg(long, default_value = "2")]
        path_len: usize,

        /// Maximum sample size
        #[arg(long, default_value = "1000")]
        sample_size: usize,

        /// Drop duplicated paths
        #[arg(long)]
        dedup: bool,

        /// Random seed (fresh entropy when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Cut off at frequencies of entities and relations
    Cutoff {
        /// File to process
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory to store data
        #[arg(long, default_value = ".")]
        outdir: PathBuf,

        /// Minimum count of entities
        #[arg(long, default_value = "1")]
        min_ent: usize,

        /// Minimum count of relations
        #[arg(long, default_value = "1")]
        min_rel: usize,

        /// Drop duplicated triples before counting
        #[arg(long)]
        dedup_before_count: bool,

        /// Drop duplicated triples after counting
        #[arg(long)]
        dedup_after_count: bool,
    },

    /// Generate a JSONL dataset of paths with negatives
    Dataset {
        /// Triples file to sample from
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path to output JSONL file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of records
        #[arg(short, long)]
        size: Option<usize>,

        /// Number of parallel workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Records per worker per round
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Negative sampling strategy
        #[arg(long, value_enum)]
        strategy: Option<NegativeStrategy>,

        /// Random seed
        #[arg(long)]
        random_state: Option<u64>,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# kb-tool configuration file

[data]
# Column order of the triples file: "hrt" or "htr"
order = "hrt"

[sampler]
mean_path_len = 1.5
max_path_len = 1
random_state = 810
forward_suffix = "::-->"
reverse_suffix = "::<--"
# Never use an entity reachable along the path as a negative
exclude_reachable = true

[dataset]
size = 1000
workers = 4
# Records per worker per round; each round is flushed to disk
chunk_size = 256
strategy = "near-miss"  # or "uniform"
# output = "output/paths.jsonl"
"#;
    println!("{example}");
}

fn load_config(path: Option<&Path>, order: Option<TripleOrder>) -> Result<Config> {
    let mut config = Config::load(path)
        .with_context(|| format!("Failed to load config from {path:?}"))?;
    if let Some(order) = order {
        config.data.order = order;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = load_config(cli.config.as_deref(), cli.order)?;
            config.validate().context("Invalid configuration")?;

            info!("Configuration is valid");
            info!(
                "  Sampler: mean path length {}, max {}, seed {}",
                config.sampler.mean_path_len,
                config.sampler.max_path_len,
                config.sampler.random_state
            );
            info!(
                "  Dataset: {} records, {} workers, {} negatives",
                config.dataset.size, config.dataset.workers, config.dataset.strategy
            );
            return Ok(());
        }

        Commands::Negatives {
            file,
            mean_path_len,
            max_path_len,
            random_state,
            count,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.order)?;
            if let Some(v) = mean_path_len {
                config.sampler.mean_path_len = v;
            }
            if let Some(v) = max_path_len {
                config.sampler.max_path_len = v;
            }
            if let Some(v) = random_state {
                config.sampler.random_state = v;
            }

            let out = stdout();
            let mut out = BufWriter::new(out.lock());
            write_negatives(&file, config.data.order, &config.sampler, count, &mut out)
                .with_context(|| format!("Failed to sample negatives from {file:?}"))?;
        }

        Commands::SamplePath {
            file,
            path_len,
            sample_size,
            dedup,
            seed,
        } => {
            let config = load_config(cli.config.as_deref(), cli.order)?;
            let triples = load_triples(&file, config.data.order)
                .with_context(|| format!("Failed to load triples from {file:?}"))?;
            let graph = KnowledgeGraph::from_triples(triples);

            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };
            let paths = sample_paths(&graph, path_len, sample_size, dedup, &config.sampler, &mut rng)?;

            let out = stdout();
            let mut out = BufWriter::new(out.lock());
            write_paths(&paths, &mut out)?;
        }

        Commands::Cutoff {
            file,
            outdir,
            min_ent,
            min_rel,
            dedup_before_count,
            dedup_after_count,
        } => {
            let config = load_config(cli.config.as_deref(), cli.order)?;
            let triples = load_triples(&file, config.data.order)
                .with_context(|| format!("Failed to load triples from {file:?}"))?;

            let options = CutoffOptions {
                min_ent,
                min_rel,
                dedup_before_count,
                dedup_after_count,
            };
            let stats = cutoff_at_frequency(triples, &outdir, &options)
                .with_context(|| format!("Failed to write cutoff data to {outdir:?}"))?;

            println!("\n=== Cutoff Complete ===");
            println!("Triples in:  {}", stats.triples_in);
            println!("Triples out: {}", stats.triples_out);
            println!("Entities:    {}", stats.entities_kept);
            println!("Relations:   {}", stats.relations_kept);
            println!("Output:      {outdir:?}");
        }

        Commands::Dataset {
            file,
            output,
            size,
            workers,
            chunk_size,
            strategy,
            random_state,
        } => {
            let mut config = load_config(cli.config.as_deref(), cli.order)?;
            if let Some(v) = size {
                config.dataset.size = v;
            }
            if let Some(v) = workers {
                config.dataset.workers = v;
            }
            if let Some(v) = chunk_size {
                config.dataset.chunk_size = v;
            }
            if let Some(v) = strategy {
                config.dataset.strategy = v;
            }
            if let Some(v) = random_state {
                config.sampler.random_state = v;
            }

            let output = output
                .or_else(|| config.dataset.output.clone())
                .context("No output path: pass --output or set dataset.output")?;

            let pipeline = DatasetPipeline::from_file(config, &file)
                .with_context(|| format!("Failed to build pipeline from {file:?}"))?;
            let stats = pipeline.run(&output).await?;

            println!("\n=== Dataset Generation Complete ===");
            println!("Requested:   {}", stats.requested);
            println!("Written:     {}", stats.written);
            println!("No negative: {}", stats.empty_negatives);
            println!("Workers:     {}", stats.workers);
            println!("Mean length: {:.2}", stats.mean_path_len);
            println!("Throughput:  {:.0}/s", stats.throughput_per_sec);
            println!("Runtime:     {:.1}s", stats.runtime_secs);
            println!("Output:      {output:?}");
        }
    }

    Ok(())
}
