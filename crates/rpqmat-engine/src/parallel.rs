//! Fixpoint evaluation on a rayon worker pool.
//!
//! Per superstep every active label expands the same frontier into its own
//! buffers, one task per label. The per-label partials are then merged by a
//! pairwise tree reduction (`ceil(log2(labels))` rounds, each round parallel
//! across pairs). Masking and accumulation stay on the calling task.
//!
//! Each task gets `&mut` access to exactly one [`LabelSlot`] through
//! `par_iter_mut`, so no two running tasks can write the same buffer.

use std::mem;
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rpqmat_sparse::{BoolMatrix, Index};
use tracing::debug;

use crate::diagnostics::{DiagnosticsSink, RunStats};
use crate::error::Result;
use crate::fixpoint;
use crate::plan::{self, Step};
use crate::query::{PrecomputedTransposes, RpqQuery};
use crate::FixpointEngine;

/// Buffers owned by one label, reused across supersteps.
struct LabelSlot {
    /// `A' x frontier`; doubles as reduction scratch once the label's
    /// partial is computed.
    symbol: BoolMatrix,
    /// `(A' x frontier) x G'`
    partial: BoolMatrix,
}

impl LabelSlot {
    fn new(states: Index, vertices: Index) -> Self {
        Self {
            symbol: BoolMatrix::new(states, vertices),
            partial: BoolMatrix::new(states, vertices),
        }
    }

    /// `self.partial <- self.partial | other.partial`
    fn absorb(&mut self, other: &LabelSlot) -> Result<()> {
        self.symbol.ewise_add(&self.partial, &other.partial)?;
        mem::swap(&mut self.symbol, &mut self.partial);
        Ok(())
    }
}

/// Parallel fixpoint evaluation.
///
/// Produces exactly the same matrix as
/// [`SequentialEngine`](crate::SequentialEngine): union is commutative and
/// associative, so task completion order cannot change the result.
#[derive(Clone)]
pub struct ParallelEngine {
    pool: Arc<ThreadPool>,
    sink: Option<Arc<dyn DiagnosticsSink>>,
}

impl ParallelEngine {
    /// Engine with its own pool of `threads` workers (`0` = one per CPU).
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rpq-worker-{i}"))
            .build()?;
        Ok(Self::with_pool(Arc::new(pool)))
    }

    /// Engine on a pool shared with other engines or queries.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self { pool, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl FixpointEngine for ParallelEngine {
    fn evaluate_with_precomputed_transposes(
        &self,
        query: &RpqQuery<'_>,
        transposes: &PrecomputedTransposes<'_>,
    ) -> Result<BoolMatrix> {
        let sink = self.sink.as_deref();
        self.pool.install(|| {
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
                threads = self.threads(),
                "parallel rpq: prepared"
            );

            // Barrier: every transpose is in place before the loop starts.
            let steps: Vec<Step<'_>> = setup
                .pending
                .into_par_iter()
                .map(|p| p.realize_parallel())
                .collect();
            let mut slots: Vec<LabelSlot> = (0..steps.len())
                .map(|_| LabelSlot::new(states, vertices))
                .collect();
            let precompute = started.elapsed();

            let started = Instant::now();
            let outcome = fixpoint::run(setup.initial, sink, |frontier, next| {
                slots
                    .par_iter_mut()
                    .zip(steps.par_iter())
                    .try_for_each(|(slot, step)| {
                        step.expand_into(frontier, &mut slot.symbol, &mut slot.partial, false)
                    })?;

                tree_reduce(&mut slots)?;
                match slots.first_mut() {
                    Some(survivor) => mem::swap(next, &mut survivor.partial),
                    None => next.clear(),
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
            debug!(?stats, "parallel rpq: done");
            if let Some(sink) = sink {
                sink.record(&stats);
            }

            Ok(outcome.reachable)
        })
    }
}

/// Fold every slot's partial into `slots[0].partial`.
///
/// Round with `n` live slots: slot `i` absorbs slot `n - 1 - i` for
/// `i < n / 2`; the middle slot of an odd round carries over unchanged.
fn tree_reduce(slots: &mut [LabelSlot]) -> Result<()> {
    let mut live = slots.len();
    while live > 1 {
        let pairs = live / 2;
        let (low, high) = slots[..live].split_at_mut(pairs);
        low.par_iter_mut()
            .zip(high.par_iter().rev())
            .try_for_each(|(dst, src)| dst.absorb(src))?;
        live = pairs + live % 2;
    }
    Ok(())
}
