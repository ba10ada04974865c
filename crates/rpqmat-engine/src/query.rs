use rpqmat_sparse::{BoolMatrix, Index};

use crate::label::{Direction, LabelSet};

/// Input of one fixpoint evaluation.
#[derive(Debug, Clone)]
pub struct RpqQuery<'a> {
    pub labels: LabelSet<'a>,
    pub source_vertices: Vec<Index>,
    pub start_states: Vec<Index>,
    pub direction: Direction,
}

impl<'a> RpqQuery<'a> {
    pub fn new(labels: LabelSet<'a>, source_vertices: Vec<Index>, start_states: Vec<Index>) -> Self {
        Self {
            labels,
            source_vertices,
            start_states,
            direction: Direction::Forward,
        }
    }

    /// Set the global direction (`allLabelsInversed`).
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

/// Transposes the caller already holds, indexed like the query's label set.
///
/// Typically the graph transposes come from a shared cache. Positions that
/// are `None` (or beyond the end) are computed by the engine when needed
/// and dropped when the evaluation ends.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedTransposes<'a> {
    pub graph: Vec<Option<&'a BoolMatrix>>,
    pub automaton: Vec<Option<&'a BoolMatrix>>,
}

impl<'a> PrecomputedTransposes<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(graph: Vec<Option<&'a BoolMatrix>>, automaton: Vec<Option<&'a BoolMatrix>>) -> Self {
        Self { graph, automaton }
    }

    pub(crate) fn graph_at(&self, position: usize) -> Option<&'a BoolMatrix> {
        self.graph.get(position).copied().flatten()
    }

    pub(crate) fn automaton_at(&self, position: usize) -> Option<&'a BoolMatrix> {
        self.automaton.get(position).copied().flatten()
    }
}
