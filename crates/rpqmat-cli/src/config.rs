//! Bench configuration: JSON file first, command-line flags on top.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use rpqmat_dataset::{EngineKind, RunnerConfig};
use serde::{Deserialize, Serialize};

/// Engine selection shared by `run` and `bench`.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Fixpoint engine: `seq` or `par`.
    #[arg(long)]
    pub engine: Option<EngineKind>,

    /// Worker threads for `--engine par` (0 = one per CPU).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Cache graph transposes once instead of transposing per query.
    #[arg(long)]
    pub pretranspose: bool,
}

impl EngineArgs {
    pub fn apply(&self, config: &mut RunnerConfig) {
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.pretranspose {
            config.pretranspose = true;
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct BenchArgs {
    /// Dataset root (contains `Graph/` and `Queries/`).
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Number of passes over all queries.
    #[arg(long)]
    pub runs: Option<usize>,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Query ids to leave out (repeatable).
    #[arg(long = "skip", value_name = "QUERY")]
    pub skip: Vec<u32>,

    /// Where `result*.txt` and `total_time_file.txt` are written.
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Also write every run's report as JSON.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Load graph matrices lazily, per query, instead of all up front.
    #[arg(long)]
    pub no_preload: bool,

    /// JSON config file; flags override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    pub dataset: Option<PathBuf>,
    pub runs: usize,
    #[serde(flatten)]
    pub runner: RunnerConfig,
    pub skip: Vec<u32>,
    pub results_dir: PathBuf,
    pub json: Option<PathBuf>,
    pub preload: bool,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            runs: 1,
            runner: RunnerConfig::default(),
            skip: Vec::new(),
            results_dir: PathBuf::from("."),
            json: None,
            preload: true,
        }
    }
}

impl BenchConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn resolve(args: &BenchArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(dataset) = &args.dataset {
            config.dataset = Some(dataset.clone());
        }
        if let Some(runs) = args.runs {
            config.runs = runs;
        }
        args.engine.apply(&mut config.runner);
        config.skip.extend(&args.skip);
        config.skip.sort_unstable();
        config.skip.dedup();
        if let Some(dir) = &args.results_dir {
            config.results_dir = dir.clone();
        }
        if let Some(json) = &args.json {
            config.json = Some(json.clone());
        }
        if args.no_preload {
            config.preload = false;
        }

        if config.dataset.is_none() {
            return Err(anyhow!("no dataset: pass --dataset or set `dataset` in the config"));
        }
        if config.runs == 0 {
            return Err(anyhow!("runs must be at least 1"));
        }
        Ok(config)
    }
}
