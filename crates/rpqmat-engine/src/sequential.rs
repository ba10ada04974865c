use std::sync::Arc;
use std::time::Instant;

use rpqmat_sparse::BoolMatrix;
use tracing::debug;

use crate::diagnostics::{DiagnosticsSink, RunStats};
use crate::error::Result;
use crate::fixpoint;
use crate::plan::{self, Step};
use crate::query::{PrecomputedTransposes, RpqQuery};
use crate::FixpointEngine;

/// Single-threaded fixpoint evaluation.
#[derive(Clone, Default)]
pub struct SequentialEngine {
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl SequentialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

impl FixpointEngine for SequentialEngine {
    fn evaluate_with_precomputed_transposes(
        &self,
        query: &RpqQuery<'_>,
        transposes: &PrecomputedTransposes<'_>,
    ) -> Result<BoolMatrix> {
        let started = Instant::now();
        let setup = plan::prepare(query, transposes)?;
        let (states, vertices) = (setup.states, setup.vertices);
        let computed_transposes = setup.transposes_needed();
        debug!(
            states,
            vertices,
            labels = query.labels.len(),
            active = setup.pending.len(),
            computed_transposes,
            "sequential rpq: prepared"
        );

        let steps: Vec<Step<'_>> = setup.pending.into_iter().map(|p| p.realize()).collect();
        let mut symbol = BoolMatrix::new(states, vertices);
        let precompute = started.elapsed();

        let started = Instant::now();
        let outcome = fixpoint::run(setup.initial, self.sink.as_deref(), |frontier, next| {
            for step in &steps {
                step.expand_into(frontier, &mut symbol, next, true)?;
            }
            Ok(())
        })?;
        let execute = started.elapsed();

        let stats = RunStats {
            active_labels: steps.len(),
            computed_transposes,
            precompute,
            execute,
            supersteps: outcome.supersteps,
            reachable_pairs: outcome.reachable.nvals(),
        };
        debug!(?stats, "sequential rpq: done");
        if let Some(sink) = &self.sink {
            sink.record(&stats);
        }

        Ok(outcome.reachable)
    }
}
