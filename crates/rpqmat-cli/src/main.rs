//! rpqmat CLI
//!
//! - `run`: evaluate one query of a dataset
//! - `bench`: run every query, repeatedly, and write timing files
//! - `inspect`: shape and size of a matrix-market file
//!
//! Logging goes to stderr; `-v` / `-vv` raise the level, `RUST_LOG`
//! overrides both.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rpqmat_dataset::{read_matrix_market, Dataset, GraphCache, QueryRunner, RunnerConfig};
use serde::Serialize;

mod bench;
mod config;

use config::{BenchArgs, BenchConfig, EngineArgs};

#[derive(Parser)]
#[command(name = "rpqmat")]
#[command(
    author,
    version,
    about = "Regular path queries over sparse boolean matrices"
)]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single query.
    Run {
        /// Dataset root (contains `Graph/` and `Queries/`).
        #[arg(long)]
        dataset: PathBuf,
        /// Query id (directory name under `Queries/`).
        #[arg(long)]
        query: u32,
        #[command(flatten)]
        engine: EngineArgs,
        /// Print the answer vertices (1-based, like the dataset files).
        #[arg(long)]
        print_vertices: bool,
        /// Print the outcome as JSON instead.
        #[arg(long)]
        json: bool,
    },

    /// Run every query of a dataset and write `result*.txt` timing files.
    Bench(BenchArgs),

    /// Print dimensions and entry counts of a matrix-market file.
    Inspect {
        #[arg(long)]
        matrix: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct MatrixSummary {
    rows: u32,
    cols: u32,
    entries: usize,
    nonzeros: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            dataset,
            query,
            engine,
            print_vertices,
            json,
        } => cmd_run(dataset, query, &engine, print_vertices, json),
        Commands::Bench(args) => {
            let config = BenchConfig::resolve(&args)?;
            bench::run_bench(&config).map(|_| ())
        }
        Commands::Inspect { matrix, json } => cmd_inspect(&matrix, json),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_run(
    root: PathBuf,
    query: u32,
    engine: &EngineArgs,
    print_vertices: bool,
    json: bool,
) -> Result<()> {
    let mut config = RunnerConfig {
        keep_vertices: print_vertices || json,
        ..RunnerConfig::default()
    };
    engine.apply(&mut config);

    let dataset = Dataset::open(&root).with_context(|| format!("opening {}", root.display()))?;
    let runner = QueryRunner::new(dataset, Arc::new(GraphCache::new()), config)?;
    let outcome = runner
        .run_query(query)
        .with_context(|| format!("query {query} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} query {}: {} vertices (load {:.6}s, execute {:.6}s)",
        "ok".green().bold(),
        outcome.query_id,
        outcome.answer_count.to_string().bold(),
        outcome.load_time.as_secs_f64(),
        outcome.execute_time.as_secs_f64()
    );
    if let Some(stats) = &outcome.stats {
        println!(
            "  {} supersteps, {} reachable pairs, {} active labels, {} transposes computed",
            stats.supersteps, stats.reachable_pairs, stats.active_labels, stats.computed_transposes
        );
    }
    if print_vertices {
        let vertices: Vec<String> = outcome
            .vertices
            .iter()
            .flatten()
            .map(|v| (u64::from(*v) + 1).to_string())
            .collect();
        println!("{}", vertices.join(" "));
    }
    Ok(())
}

fn cmd_inspect(path: &Path, json: bool) -> Result<()> {
    let coordinates = read_matrix_market(path)?;
    let entries = coordinates.nvals();
    let matrix = coordinates
        .into_bool_matrix()
        .with_context(|| format!("building matrix from {}", path.display()))?;
    let summary = MatrixSummary {
        rows: matrix.nrows(),
        cols: matrix.ncols(),
        entries,
        nonzeros: matrix.nvals(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", path.display().to_string().bold());
        println!("  shape:    {} x {}", summary.rows, summary.cols);
        println!("  entries:  {}", summary.entries);
        println!("  nonzeros: {}", summary.nonzeros);
    }
    Ok(())
}
