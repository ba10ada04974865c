//! Batch benchmark over every query of a dataset.
//!
//! Per run, one line per query goes to stdout and to `result<k>.txt`
//! (`result.txt` for a single run):
//!
//! ```text
//! query execute_time load_time result
//! ```
//!
//! Times are seconds. Run totals are appended to `total_time_file.txt`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use rpqmat_dataset::{BenchReport, Dataset, GraphCache, QueryEvent, QueryRunner};
use serde::Serialize;
use tracing::debug;

use crate::config::BenchConfig;

pub const TOTAL_TIME_FILE: &str = "total_time_file.txt";

#[derive(Serialize)]
struct JsonReport<'a> {
    config: &'a BenchConfig,
    runs: &'a [BenchReport],
}

pub fn result_file_name(runs: usize, run: usize) -> String {
    if runs == 1 {
        "result.txt".to_string()
    } else {
        format!("result{run}.txt")
    }
}

pub fn run_bench(config: &BenchConfig) -> Result<Vec<BenchReport>> {
    debug!(?config, "bench config");
    let root = config
        .dataset
        .as_deref()
        .context("bench config has no dataset")?;
    let dataset = Dataset::open(root).with_context(|| format!("opening {}", root.display()))?;
    let ids: Vec<u32> = dataset
        .query_ids()?
        .into_iter()
        .filter(|id| !config.skip.contains(id))
        .collect();

    println!("{} {}", "dataset:".bold(), root.display());
    println!(
        "{} {} queries, {} engine, {} run(s)",
        "bench:".bold(),
        ids.len(),
        config.runner.engine,
        config.runs
    );

    let runner = QueryRunner::new(dataset, Arc::new(GraphCache::new()), config.runner.clone())?;
    if config.preload {
        let summary = runner.preload(&ids);
        println!(
            "matrices loaded, time: {:.6}s ({} loaded, {} absent, {} failed)",
            summary.elapsed.as_secs_f64(),
            summary.loaded,
            summary.absent.len(),
            summary.failed.len()
        );
    }

    fs::create_dir_all(&config.results_dir)
        .with_context(|| format!("creating {}", config.results_dir.display()))?;
    let total_time_path = config.results_dir.join(TOTAL_TIME_FILE);
    match fs::remove_file(&total_time_path) {
        Err(err) if err.kind() != ErrorKind::NotFound => {
            return Err(err).with_context(|| format!("removing {}", total_time_path.display()))
        }
        _ => {}
    }

    let mut reports = Vec::with_capacity(config.runs);
    for run in 1..=config.runs {
        println!("{}", format!("run {run}").bold());
        println!("query execute_time load_time result");

        let report = runner.run_all_with(&ids, |event| match event {
            QueryEvent::Finished(o) => println!(
                "{} {:.6} {:.6} {}",
                o.query_id,
                o.execute_time.as_secs_f64(),
                o.load_time.as_secs_f64(),
                o.answer_count
            ),
            QueryEvent::Skipped(s) => println!("{} {}", s.query_id, "skipped".yellow()),
        });

        let result_path = config
            .results_dir
            .join(result_file_name(config.runs, run));
        write_results(&result_path, &report)?;
        append_totals(&total_time_path, &report)?;

        println!();
        println!(
            "{} total load time: {:.6}, total execute time: {:.6}",
            "ok".green().bold(),
            report.total_load_time.as_secs_f64(),
            report.total_execute_time.as_secs_f64()
        );
        if !report.skipped.is_empty() {
            println!(
                "{} {} queries skipped",
                "warn".yellow().bold(),
                report.skipped.len()
            );
        }
        reports.push(report);
    }

    if let Some(json) = &config.json {
        let file = File::create(json).with_context(|| format!("creating {}", json.display()))?;
        let report = JsonReport {
            config,
            runs: &reports,
        };
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &report)?;
        out.flush()?;
        eprintln!("{} {}", "wrote".green().bold(), json.display().to_string().bold());
    }

    Ok(reports)
}

fn write_results(path: &Path, report: &BenchReport) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for o in &report.outcomes {
        writeln!(
            out,
            "{} {:.6} {:.6} {}",
            o.query_id,
            o.execute_time.as_secs_f64(),
            o.load_time.as_secs_f64(),
            o.answer_count
        )?;
    }
    out.flush()
        .with_context(|| format!("writing {}", path.display()))
}

fn append_totals(path: &Path, report: &BenchReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(
        file,
        "total load time: {:.6}, total execute time: {:.6}\n",
        report.total_load_time.as_secs_f64(),
        report.total_execute_time.as_secs_f64()
    )
    .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_run_writes_plain_result_file() {
        assert_eq!(result_file_name(1, 1), "result.txt");
        assert_eq!(result_file_name(3, 2), "result2.txt");
    }

    #[test]
    fn bench_writes_result_and_total_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        fs::create_dir_all(root.join("Graph")).unwrap();
        fs::create_dir_all(root.join("Queries/1")).unwrap();
        fs::create_dir_all(root.join("Queries/2")).unwrap();
        fs::write(root.join("Graph/1.txt"), "2 2 1\n1 2\n").unwrap();
        fs::write(root.join("Queries/1/meta.txt"), "1 0 1 1 1 2 1 1").unwrap();
        fs::write(root.join("Queries/1/1.txt"), "2 2 1\n1 2\n").unwrap();
        fs::write(root.join("Queries/2/meta.txt"), "1 0 1 1 1 2 1 1").unwrap();

        let results = dir.path().join("out");
        let config = BenchConfig {
            dataset: Some(root),
            runs: 2,
            results_dir: results.clone(),
            json: Some(dir.path().join("report.json")),
            ..BenchConfig::default()
        };
        let reports = run_bench(&config).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].outcomes[0].answer_count, 1);
        assert_eq!(reports[0].skipped[0].query_id, 2);

        let first = fs::read_to_string(results.join("result1.txt")).unwrap();
        assert!(first.starts_with("1 "));
        assert!(first.trim_end().ends_with(" 1"));
        assert_eq!(first.lines().count(), 1);
        assert!(results.join("result2.txt").is_file());

        let totals = fs::read_to_string(results.join(TOTAL_TIME_FILE)).unwrap();
        assert_eq!(totals.matches("total load time").count(), 2);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(json["runs"].as_array().unwrap().len(), 2);
        assert_eq!(json["config"]["runs"], 2);
    }
}
