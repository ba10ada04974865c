//! Query orchestration: load a query's matrices, evaluate, extract the
//! answer, and run whole batches with per-query failure isolation.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rpqmat_engine::{
    extract_answer, DiagnosticsSink, FixpointEngine, LabelEntry, LabelSet, ParallelEngine,
    PrecomputedTransposes, RpqError, RpqQuery, RunStats, SequentialEngine,
};
use rpqmat_sparse::{BoolMatrix, Index};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::cache::{CachedGraph, GraphCache, PreloadSummary};
use crate::dataset::Dataset;
use crate::descriptor::{QueryDescriptor, ResolvedQuery};
use crate::error::{DatasetError, Result};
use crate::matrix_market::read_bool_matrix;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Sequential,
    Parallel,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "seq" | "sequential" => Ok(Self::Sequential),
            "par" | "parallel" => Ok(Self::Parallel),
            other => Err(format!(
                "unknown engine `{other}` (expected `seq` or `par`)"
            )),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub engine: EngineKind,
    /// Worker threads of the parallel engine; `0` = one per CPU.
    pub threads: usize,
    /// Cache graph transposes alongside the graphs and hand them to the
    /// engine instead of transposing per query.
    pub pretranspose: bool,
    /// Keep the answer vertex set, not just its size.
    pub keep_vertices: bool,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query_id: u32,
    pub answer_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Vec<Index>>,
    #[serde(serialize_with = "as_secs")]
    pub load_time: Duration,
    #[serde(serialize_with = "as_secs")]
    pub execute_time: Duration,
    pub stats: Option<RunStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedQuery {
    pub query_id: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchReport {
    pub outcomes: Vec<QueryOutcome>,
    pub skipped: Vec<SkippedQuery>,
    #[serde(serialize_with = "as_secs")]
    pub total_load_time: Duration,
    #[serde(serialize_with = "as_secs")]
    pub total_execute_time: Duration,
}

impl BenchReport {
    fn push(&mut self, outcome: QueryOutcome) {
        self.total_load_time += outcome.load_time;
        self.total_execute_time += outcome.execute_time;
        self.outcomes.push(outcome);
    }
}

/// Per-query progress of [`QueryRunner::run_all_with`].
#[derive(Debug, Clone, Copy)]
pub enum QueryEvent<'a> {
    Finished(&'a QueryOutcome),
    Skipped(&'a SkippedQuery),
}

fn as_secs<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

// ============================================================================
// Loaded query
// ============================================================================

/// Everything one query evaluation needs.
///
/// Automaton matrices are owned here and dropped with the query; graph
/// matrices are shared with the cache.
#[derive(Debug)]
pub struct LoadedQuery {
    pub id: u32,
    pub descriptor: QueryDescriptor,
    pub resolved: ResolvedQuery,
    pub load_time: Duration,
    graphs: Vec<Option<Arc<CachedGraph>>>,
    automata: Vec<BoolMatrix>,
}

impl LoadedQuery {
    pub fn labels(&self) -> LabelSet<'_> {
        self.descriptor
            .labels
            .iter()
            .zip(&self.graphs)
            .zip(&self.automata)
            .map(|((label, graph), automaton)| LabelEntry {
                graph: graph.as_deref().map(|g| &*g.matrix),
                automaton: Some(automaton),
                inverse: label.inverse,
            })
            .collect()
    }

    /// Graph transposes already held by the cache.
    pub fn transposes(&self) -> PrecomputedTransposes<'_> {
        let graph = self
            .graphs
            .iter()
            .map(|g| g.as_deref().and_then(|g| g.transposed.as_ref()))
            .collect();
        PrecomputedTransposes::new(graph, Vec::new())
    }

    pub fn rpq_query(&self) -> RpqQuery<'_> {
        RpqQuery::new(
            self.labels(),
            self.resolved.source_vertices.clone(),
            self.resolved.start_states.clone(),
        )
        .with_direction(self.resolved.direction)
    }

    /// Labels whose graph matrix is missing from the dataset.
    pub fn absent_graph_labels(&self) -> Vec<u32> {
        self.descriptor
            .labels
            .iter()
            .zip(&self.graphs)
            .filter(|(_, g)| g.is_none())
            .map(|(l, _)| l.id)
            .collect()
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Keeps the stats of the most recent evaluation.
#[derive(Debug, Default)]
struct LastStats(Mutex<Option<RunStats>>);

impl DiagnosticsSink for LastStats {
    fn record(&self, stats: &RunStats) {
        *self.0.lock() = Some(stats.clone());
    }
}

enum Engine {
    Sequential(SequentialEngine),
    Parallel(ParallelEngine),
}

impl Engine {
    fn as_dyn(&self) -> &dyn FixpointEngine {
        match self {
            Self::Sequential(e) => e as &dyn FixpointEngine,
            Self::Parallel(e) => e,
        }
    }
}

pub struct QueryRunner {
    dataset: Dataset,
    cache: Arc<GraphCache>,
    config: RunnerConfig,
    engine: Engine,
    last_stats: Arc<LastStats>,
}

impl QueryRunner {
    pub fn new(dataset: Dataset, cache: Arc<GraphCache>, config: RunnerConfig) -> Result<Self> {
        let last_stats = Arc::new(LastStats::default());
        let engine = match config.engine {
            EngineKind::Sequential => {
                Engine::Sequential(SequentialEngine::new().with_sink(last_stats.clone()))
            }
            EngineKind::Parallel => Engine::Parallel(
                ParallelEngine::new(config.threads)?.with_sink(last_stats.clone()),
            ),
        };
        Ok(Self {
            dataset,
            cache,
            config,
            engine,
            last_stats,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn cache(&self) -> &Arc<GraphCache> {
        &self.cache
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Load the graph matrices of every readable query among `query_ids`.
    pub fn preload(&self, query_ids: &[u32]) -> PreloadSummary {
        let mut labels: Vec<u32> = Vec::new();
        for &id in query_ids {
            match self.dataset.read_descriptor(id) {
                Ok(descriptor) => labels.extend(descriptor.graph_labels()),
                Err(err) => debug!(query = id, error = %err, "not preloading query"),
            }
        }
        labels.sort_unstable();
        labels.dedup();
        self.cache
            .preload(&self.dataset, &labels, self.config.pretranspose)
    }

    pub fn load(&self, query_id: u32) -> Result<LoadedQuery> {
        let started = Instant::now();
        let descriptor = self.dataset.read_descriptor(query_id)?;
        let resolved = descriptor
            .resolve()
            .map_err(|source| DatasetError::Descriptor {
                path: self.dataset.descriptor_path(query_id),
                source,
            })?;

        let mut graphs = Vec::with_capacity(descriptor.labels.len());
        let mut automata = Vec::with_capacity(descriptor.labels.len());
        for &label in &descriptor.labels {
            graphs.push(
                self.cache
                    .get_or_load(&self.dataset, label.id, self.config.pretranspose)?,
            );

            let path = self.dataset.automaton_path(query_id, label);
            if !path.is_file() {
                return Err(DatasetError::MissingAutomaton {
                    query: query_id,
                    label: label.to_string(),
                    path,
                });
            }
            automata.push(read_bool_matrix(&path)?);
        }

        let query = LoadedQuery {
            id: query_id,
            descriptor,
            resolved,
            load_time: started.elapsed(),
            graphs,
            automata,
        };
        let absent = query.absent_graph_labels();
        if !absent.is_empty() {
            debug!(query = query_id, ?absent, "labels without graph matrix are skipped");
        }
        Ok(query)
    }

    pub fn execute(&self, query: &LoadedQuery) -> Result<QueryOutcome> {
        let evaluation = |source: RpqError| DatasetError::Evaluation {
            query: query.id,
            source,
        };

        let started = Instant::now();
        let rpq = query.rpq_query();
        let engine = self.engine.as_dyn();
        let reachable = if self.config.pretranspose {
            engine.evaluate_with_precomputed_transposes(&rpq, &query.transposes())
        } else {
            engine.evaluate(&rpq)
        }
        .map_err(evaluation)?;
        let answer = extract_answer(&reachable, &query.resolved.final_states).map_err(evaluation)?;
        let execute_time = started.elapsed();

        let outcome = QueryOutcome {
            query_id: query.id,
            answer_count: answer.count(),
            vertices: self.config.keep_vertices.then(|| answer.vertices()),
            load_time: query.load_time,
            execute_time,
            stats: self.last_stats.0.lock().take(),
        };
        debug!(
            query = query.id,
            answer = outcome.answer_count,
            ?execute_time,
            "query done"
        );
        Ok(outcome)
    }

    pub fn run_query(&self, query_id: u32) -> Result<QueryOutcome> {
        let query = self.load(query_id)?;
        self.execute(&query)
    }

    pub fn run_all(&self, query_ids: &[u32]) -> BenchReport {
        self.run_all_with(query_ids, |_| {})
    }

    /// Run every query in order. A failing query is logged and recorded as
    /// skipped; the batch goes on.
    pub fn run_all_with<F>(&self, query_ids: &[u32], mut observe: F) -> BenchReport
    where
        F: FnMut(QueryEvent<'_>),
    {
        let mut report = BenchReport::default();
        for &id in query_ids {
            match self.run_query(id) {
                Ok(outcome) => {
                    observe(QueryEvent::Finished(&outcome));
                    report.push(outcome);
                }
                Err(err) => {
                    warn!(query = id, error = %err, "query skipped");
                    let skipped = SkippedQuery {
                        query_id: id,
                        reason: err.to_string(),
                    };
                    observe(QueryEvent::Skipped(&skipped));
                    report.skipped.push(skipped);
                }
            }
        }
        info!(
            finished = report.outcomes.len(),
            skipped = report.skipped.len(),
            load = ?report.total_load_time,
            execute = ?report.total_execute_time,
            "batch done"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parses_short_and_long_names() {
        assert_eq!("seq".parse::<EngineKind>(), Ok(EngineKind::Sequential));
        assert_eq!("parallel".parse::<EngineKind>(), Ok(EngineKind::Parallel));
        assert!("gpu".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::Parallel.to_string(), "parallel");
    }

    #[test]
    fn runner_config_fills_missing_fields() {
        let config: RunnerConfig = serde_json::from_str(r#"{"engine": "parallel"}"#).unwrap();
        assert_eq!(
            config,
            RunnerConfig {
                engine: EngineKind::Parallel,
                ..RunnerConfig::default()
            }
        );
    }

    #[test]
    fn outcome_serializes_times_as_seconds() {
        let outcome = QueryOutcome {
            query_id: 7,
            answer_count: 2,
            vertices: None,
            load_time: Duration::from_millis(1500),
            execute_time: Duration::from_millis(250),
            stats: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["load_time"], 1.5);
        assert_eq!(json["execute_time"], 0.25);
        assert!(json.get("vertices").is_none());
    }
}
