use crate::Index;

/// Failure reported by a sparse boolean primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatrixError {
    #[error("failed to allocate storage for {entries} entries")]
    Allocation { entries: u64 },

    #[error("{op}: dimension mismatch ({}x{} vs {}x{})", left.0, left.1, right.0, right.1)]
    DimensionMismatch {
        op: &'static str,
        left: (Index, Index),
        right: (Index, Index),
    },

    #[error("{op}: coordinate ({row}, {col}) outside {rows}x{cols}")]
    OutOfBounds {
        op: &'static str,
        row: Index,
        col: Index,
        rows: Index,
        cols: Index,
    },

    #[error("build: {rows} row indices but {cols} column indices")]
    LengthMismatch { rows: usize, cols: usize },
}

pub type Result<T> = std::result::Result<T, MatrixError>;
