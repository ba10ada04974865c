//! The frontier-expansion loop shared by both engines.
//!
//! Engines differ only in how a superstep expands the frontier; masking and
//! accumulation run here, single-threaded, once per superstep after every
//! label has contributed.

use std::mem;

use rpqmat_sparse::BoolMatrix;
use tracing::trace;

use crate::diagnostics::{DiagnosticsSink, SuperstepStats};
use crate::error::Result;

pub(crate) struct Outcome {
    pub reachable: BoolMatrix,
    pub supersteps: usize,
}

/// Run to a fixpoint from `initial`.
///
/// `expand(frontier, next)` receives a cleared `next` and must leave in it
/// the union over labels of `(A' x frontier) x G'`.
pub(crate) fn run<F>(
    initial: BoolMatrix,
    sink: Option<&dyn DiagnosticsSink>,
    mut expand: F,
) -> Result<Outcome>
where
    F: FnMut(&BoolMatrix, &mut BoolMatrix) -> Result<()>,
{
    let (states, vertices) = initial.shape();
    let mut reachable = initial.clone();
    let mut frontier = initial;
    let mut next = BoolMatrix::new(states, vertices);
    let mut scratch = BoolMatrix::new(states, vertices);
    let mut supersteps = 0usize;

    while !frontier.is_empty() {
        next.clear();
        expand(&frontier, &mut next)?;

        // Pairs already reached are never expanded again: this bounds the
        // run by `states * vertices` supersteps.
        scratch.ewise_mult_inverted(&next, &reachable)?;
        mem::swap(&mut next, &mut scratch);

        reachable.union_with(&next)?;
        mem::swap(&mut frontier, &mut next);

        supersteps += 1;
        let stats = SuperstepStats {
            index: supersteps,
            frontier_pairs: frontier.nvals(),
            reachable_pairs: reachable.nvals(),
        };
        trace!(
            superstep = stats.index,
            frontier = stats.frontier_pairs,
            reachable = stats.reachable_pairs,
            "superstep done"
        );
        if let Some(sink) = sink {
            sink.superstep(&stats);
        }
    }

    Ok(Outcome {
        reachable,
        supersteps,
    })
}
