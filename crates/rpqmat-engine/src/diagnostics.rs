//! Structured timing and progress reports from an evaluation.

use std::time::Duration;

use serde::Serialize;

/// Summary of one finished evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStats {
    /// Labels with both matrices present.
    pub active_labels: usize,
    /// Transposes computed by the engine (not supplied by the caller).
    pub computed_transposes: usize,
    /// Validation, transposes and buffer allocation.
    pub precompute: Duration,
    /// The fixpoint loop.
    pub execute: Duration,
    pub supersteps: usize,
    pub reachable_pairs: u64,
}

/// State after one superstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuperstepStats {
    /// 1-based.
    pub index: usize,
    pub frontier_pairs: u64,
    pub reachable_pairs: u64,
}

/// Receiver for evaluation diagnostics.
///
/// Closures `Fn(&RunStats)` implement this directly.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, stats: &RunStats);

    fn superstep(&self, _stats: &SuperstepStats) {}
}

impl<F> DiagnosticsSink for F
where
    F: Fn(&RunStats) + Send + Sync,
{
    fn record(&self, stats: &RunStats) {
        self(stats)
    }
}
