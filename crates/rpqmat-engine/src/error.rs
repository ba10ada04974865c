use rpqmat_sparse::MatrixError;

/// Errors fatal to a single query evaluation.
///
/// Nothing is retried inside the engine; every matrix owned by the failed
/// evaluation has been dropped by the time the caller sees the error.
#[derive(Debug, thiserror::Error)]
pub enum RpqError {
    #[error("matrix allocation failed: {0}")]
    MatrixAllocationFailed(#[source] MatrixError),

    #[error("matrix operation failed: {0}")]
    MatrixOperationFailed(#[source] MatrixError),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<MatrixError> for RpqError {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::Allocation { .. } => Self::MatrixAllocationFailed(err),
            _ => Self::MatrixOperationFailed(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, RpqError>;
