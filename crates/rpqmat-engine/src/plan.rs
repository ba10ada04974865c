//! Setup shared by both engines: validation, dimensions, per-label
//! orientation and the transposes each label still needs.

use std::borrow::Cow;

use rpqmat_sparse::{BoolMatrix, Index};
use tracing::trace;

use crate::error::{Result, RpqError};
use crate::label::{LabelPlan, Orientation};
use crate::query::{PrecomputedTransposes, RpqQuery};

/// Where the matrix a label multiplies with comes from.
pub(crate) enum MatrixSource<'a> {
    /// Plain matrix, or a transpose supplied by the caller.
    Ready(&'a BoolMatrix),
    /// Transpose still has to be computed; the result is owned by the run.
    TransposeOf(&'a BoolMatrix),
}

impl<'a> MatrixSource<'a> {
    fn pick(
        plain: &'a BoolMatrix,
        orientation: Orientation,
        precomputed: Option<&'a BoolMatrix>,
    ) -> Self {
        match (orientation, precomputed) {
            (Orientation::UseMatrix, _) => Self::Ready(plain),
            (Orientation::UseTranspose, Some(transposed)) => Self::Ready(transposed),
            (Orientation::UseTranspose, None) => Self::TransposeOf(plain),
        }
    }

    pub(crate) fn needs_transpose(&self) -> bool {
        matches!(self, Self::TransposeOf(_))
    }

    pub(crate) fn realize(self) -> Cow<'a, BoolMatrix> {
        match self {
            Self::Ready(matrix) => Cow::Borrowed(matrix),
            Self::TransposeOf(matrix) => Cow::Owned(matrix.transpose()),
        }
    }
}

/// An active label before its transposes are materialized.
pub(crate) struct PendingStep<'a> {
    pub position: usize,
    pub automaton: MatrixSource<'a>,
    pub graph: MatrixSource<'a>,
}

impl<'a> PendingStep<'a> {
    pub(crate) fn realize(self) -> Step<'a> {
        self.trace_transposes();
        Step {
            automaton: self.automaton.realize(),
            graph: self.graph.realize(),
        }
    }

    /// Like [`realize`](Self::realize), with the two transposes as separate
    /// tasks on the current rayon pool.
    pub(crate) fn realize_parallel(self) -> Step<'a> {
        self.trace_transposes();
        let (automaton, graph) = rayon::join(|| self.automaton.realize(), || self.graph.realize());
        Step { automaton, graph }
    }

    fn trace_transposes(&self) {
        if self.automaton.needs_transpose() || self.graph.needs_transpose() {
            trace!(
                label = self.position,
                automaton = self.automaton.needs_transpose(),
                graph = self.graph.needs_transpose(),
                "computing transposes"
            );
        }
    }
}

/// An active label, ready for the main loop.
pub(crate) struct Step<'a> {
    pub automaton: Cow<'a, BoolMatrix>,
    pub graph: Cow<'a, BoolMatrix>,
}

impl Step<'_> {
    /// `symbol <- A' x frontier; out (+)= symbol x G'`.
    pub(crate) fn expand_into(
        &self,
        frontier: &BoolMatrix,
        symbol: &mut BoolMatrix,
        out: &mut BoolMatrix,
        accumulate: bool,
    ) -> Result<()> {
        symbol.mxm(&self.automaton, frontier, false)?;
        out.mxm(symbol, &self.graph, accumulate)?;
        Ok(())
    }
}

pub(crate) struct Setup<'a> {
    pub states: Index,
    pub vertices: Index,
    pub pending: Vec<PendingStep<'a>>,
    /// `start_states x source_vertices`
    pub initial: BoolMatrix,
}

impl Setup<'_> {
    pub(crate) fn transposes_needed(&self) -> usize {
        self.pending
            .iter()
            .map(|p| {
                usize::from(p.automaton.needs_transpose()) + usize::from(p.graph.needs_transpose())
            })
            .sum()
    }
}

pub(crate) fn prepare<'a>(
    query: &RpqQuery<'a>,
    transposes: &PrecomputedTransposes<'a>,
) -> Result<Setup<'a>> {
    let entries = query.labels.entries();

    let vertices = entries
        .iter()
        .find_map(|e| e.graph)
        .map(BoolMatrix::nrows)
        .ok_or(RpqError::EmptyInput("no graph matrix in label set"))?;
    let states = entries
        .iter()
        .find_map(|e| e.automaton)
        .map(BoolMatrix::nrows)
        .ok_or(RpqError::EmptyInput("no automaton matrix in label set"))?;

    if query.source_vertices.is_empty() {
        return Err(RpqError::EmptyInput("no source vertices"));
    }
    if query.start_states.is_empty() {
        return Err(RpqError::EmptyInput("no start states"));
    }

    let mut pending = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        if let Some(graph) = entry.graph {
            check_square("graph", position, graph, vertices)?;
        }
        if let Some(automaton) = entry.automaton {
            check_square("automaton", position, automaton, states)?;
        }
        let (Some(graph), Some(automaton)) = (entry.graph, entry.automaton) else {
            continue;
        };

        let graph_t = transposes.graph_at(position);
        let automaton_t = transposes.automaton_at(position);
        if let Some(t) = graph_t {
            check_square("graph transpose", position, t, vertices)?;
        }
        if let Some(t) = automaton_t {
            check_square("automaton transpose", position, t, states)?;
        }

        let plan = LabelPlan::resolve(query.direction, entry.inverse);
        pending.push(PendingStep {
            position,
            automaton: MatrixSource::pick(automaton, plan.automaton, automaton_t),
            graph: MatrixSource::pick(graph, plan.graph, graph_t),
        });
    }
    if pending.is_empty() {
        return Err(RpqError::EmptyInput(
            "no label with both graph and automaton matrices",
        ));
    }

    let initial = initial_product(states, vertices, &query.start_states, &query.source_vertices)?;

    Ok(Setup {
        states,
        vertices,
        pending,
        initial,
    })
}

fn check_square(what: &str, position: usize, matrix: &BoolMatrix, n: Index) -> Result<()> {
    if matrix.shape() != (n, n) {
        return Err(RpqError::DimensionMismatch(format!(
            "{what} matrix at label position {position} is {}x{}, expected {n}x{n}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    Ok(())
}

fn initial_product(
    states: Index,
    vertices: Index,
    start_states: &[Index],
    source_vertices: &[Index],
) -> Result<BoolMatrix> {
    if let Some(&state) = start_states.iter().find(|&&s| s >= states) {
        return Err(RpqError::DimensionMismatch(format!(
            "start state {state} outside automaton with {states} states"
        )));
    }
    if let Some(&vertex) = source_vertices.iter().find(|&&v| v >= vertices) {
        return Err(RpqError::DimensionMismatch(format!(
            "source vertex {vertex} outside graph with {vertices} vertices"
        )));
    }

    let mut initial = BoolMatrix::new(states, vertices);
    for &state in start_states {
        for &vertex in source_vertices {
            initial.set_element(state, vertex)?;
        }
    }
    Ok(initial)
}
