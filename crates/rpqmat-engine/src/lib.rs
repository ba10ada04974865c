//! Regular path query evaluation over sparse boolean matrices.
//!
//! A query is a graph (one adjacency matrix per edge label), an automaton
//! (one transition matrix per label), source vertices and start states. The
//! engines walk graph and automaton together, breadth-first over the
//! product, until no new `(state, vertex)` pair appears:
//!
//! ```text
//! Reachable = Frontier = start_states x source_vertices
//! while Frontier != 0:
//!     next     = OR_label (A' x Frontier) x G'
//!     next     = next & !Reachable
//!     Reachable |= next
//!     Frontier = next
//! ```
//!
//! [`extract_answer`] then projects `Reachable` onto the final states.
//!
//! ## Engines
//!
//! - [`SequentialEngine`]: one thread.
//! - [`ParallelEngine`]: per-label products as tasks on a rayon pool, tree
//!   reduction of the partials. Bit-identical results.
//!
//! ## Ownership
//!
//! Graph and automaton matrices are borrowed; a shared cache can hand the
//! same graph matrix to many queries. Transposes the caller does not supply,
//! the frontier and all buffers are owned by one evaluation and dropped when
//! it returns, on success or error.

mod diagnostics;
mod error;
mod extract;
mod fixpoint;
mod label;
mod parallel;
mod plan;
mod query;
mod sequential;

use rpqmat_sparse::BoolMatrix;

pub use diagnostics::{DiagnosticsSink, RunStats, SuperstepStats};
pub use error::{Result, RpqError};
pub use extract::{extract_answer, Answer};
pub use label::{Direction, Label, LabelEntry, LabelPlan, LabelSet, Orientation};
pub use parallel::ParallelEngine;
pub use query::{PrecomputedTransposes, RpqQuery};
pub use sequential::SequentialEngine;

/// A strategy for running the fixpoint loop.
pub trait FixpointEngine {
    /// Evaluate, computing every needed transpose locally.
    fn evaluate(&self, query: &RpqQuery<'_>) -> Result<BoolMatrix> {
        self.evaluate_with_precomputed_transposes(query, &PrecomputedTransposes::none())
    }

    /// Evaluate, borrowing whatever transposes `transposes` supplies.
    fn evaluate_with_precomputed_transposes(
        &self,
        query: &RpqQuery<'_>,
        transposes: &PrecomputedTransposes<'_>,
    ) -> Result<BoolMatrix>;
}
