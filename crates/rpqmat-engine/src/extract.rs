use rpqmat_sparse::{BoolMatrix, BoolVector, Index};

use crate::error::{Result, RpqError};

/// Graph vertices reached in an accepting automaton state.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    vertices: BoolVector,
}

impl Answer {
    pub fn count(&self) -> u64 {
        self.vertices.nvals()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, vertex: Index) -> bool {
        self.vertices.contains(vertex)
    }

    /// Vertices in ascending order.
    pub fn vertices(&self) -> Vec<Index> {
        self.vertices.extract_values()
    }

    pub fn as_vector(&self) -> &BoolVector {
        &self.vertices
    }
}

/// `P <- F^T x Reachable` where `F` marks `final_states`.
///
/// For a reversed query pass the original *start* states here; the caller
/// swaps the roles before evaluation.
pub fn extract_answer(reachable: &BoolMatrix, final_states: &[Index]) -> Result<Answer> {
    let states = reachable.nrows();
    if let Some(&state) = final_states.iter().find(|&&s| s >= states) {
        return Err(RpqError::DimensionMismatch(format!(
            "final state {state} outside automaton with {states} states"
        )));
    }

    let finals = BoolVector::from_indices(states, final_states)?;
    let mut vertices = BoolVector::new(reachable.ncols());
    vertices.vxm(&finals, reachable)?;
    Ok(Answer { vertices })
}
