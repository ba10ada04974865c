//! Labels, query direction and the per-label choice between a matrix and
//! its transpose.

use std::fmt;

use rpqmat_sparse::BoolMatrix;
use serde::{Deserialize, Serialize};

// ============================================================================
// Labels
// ============================================================================

/// An edge label as it appears in a query.
///
/// `inverse` labels are traversed against the stored edge direction. On disk
/// they are written as negative integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: u32,
    pub inverse: bool,
}

impl Label {
    pub const fn new(id: u32) -> Self {
        Self { id, inverse: false }
    }

    pub const fn inverse(id: u32) -> Self {
        Self { id, inverse: true }
    }

    /// Decode the sign-encoded form (`-3` is label 3 traversed backwards).
    pub fn from_signed(raw: i64) -> Option<Self> {
        let id = u32::try_from(raw.unsigned_abs()).ok()?;
        Some(Self {
            id,
            inverse: raw < 0,
        })
    }

    pub fn to_signed(self) -> i64 {
        if self.inverse {
            -i64::from(self.id)
        } else {
            i64::from(self.id)
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_signed())
    }
}

// ============================================================================
// Direction / orientation
// ============================================================================

/// Whether the whole query walks from sources forward, or from
/// destinations backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reversed,
}

impl Direction {
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed {
            Self::Reversed
        } else {
            Self::Forward
        }
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Self::Reversed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    UseMatrix,
    UseTranspose,
}

impl Orientation {
    fn transposed_if(flag: bool) -> Self {
        if flag {
            Self::UseTranspose
        } else {
            Self::UseMatrix
        }
    }
}

/// Which orientation of each matrix a label multiplies with.
///
/// The frontier is `states x vertices`, so a superstep is
/// `(A' x Frontier) x G'`:
/// - `A'` is `A^T` going forward ("where can I go") and `A` when reversed
///   ("where could I have come from").
/// - `G'` is `G^T` iff the label's own inversion differs from the query
///   direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPlan {
    pub automaton: Orientation,
    pub graph: Orientation,
}

impl LabelPlan {
    pub fn resolve(direction: Direction, inverse: bool) -> Self {
        let reversed = direction.is_reversed();
        Self {
            automaton: Orientation::transposed_if(!reversed),
            graph: Orientation::transposed_if(inverse ^ reversed),
        }
    }
}

// ============================================================================
// Label set
// ============================================================================

/// One label position: the graph and automaton matrices for that label.
///
/// Either side may be absent (failed to load, or the label does not occur
/// on that side). Absent entries are skipped by the engines.
#[derive(Debug, Clone, Copy)]
pub struct LabelEntry<'a> {
    pub graph: Option<&'a BoolMatrix>,
    pub automaton: Option<&'a BoolMatrix>,
    pub inverse: bool,
}

impl<'a> LabelEntry<'a> {
    pub fn new(graph: &'a BoolMatrix, automaton: &'a BoolMatrix) -> Self {
        Self {
            graph: Some(graph),
            automaton: Some(automaton),
            inverse: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverse = true;
        self
    }

    pub fn is_active(&self) -> bool {
        self.graph.is_some() && self.automaton.is_some()
    }
}

/// Ordered label positions of one query.
#[derive(Debug, Clone, Default)]
pub struct LabelSet<'a> {
    entries: Vec<LabelEntry<'a>>,
}

impl<'a> LabelSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip parallel per-label arrays.
    ///
    /// The set has `min(graph.len(), automaton.len())` positions; missing
    /// inversion flags default to `false`.
    pub fn from_parallel(
        graph: &[Option<&'a BoolMatrix>],
        automaton: &[Option<&'a BoolMatrix>],
        inverse: &[bool],
    ) -> Self {
        let entries = graph
            .iter()
            .zip(automaton)
            .enumerate()
            .map(|(i, (&graph, &automaton))| LabelEntry {
                graph,
                automaton,
                inverse: inverse.get(i).copied().unwrap_or(false),
            })
            .collect();
        Self { entries }
    }

    pub fn push(&mut self, entry: LabelEntry<'a>) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LabelEntry<'a>] {
        &self.entries
    }

    /// Number of positions with both matrices present.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_active()).count()
    }
}

impl<'a> FromIterator<LabelEntry<'a>> for LabelSet<'a> {
    fn from_iter<I: IntoIterator<Item = LabelEntry<'a>>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
