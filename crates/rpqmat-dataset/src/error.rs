use std::path::PathBuf;

use rpqmat_engine::RpqError;
use rpqmat_sparse::MatrixError;
use thiserror::Error;

/// Malformed matrix-market input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixMarketError {
    #[error("parse error on line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("missing size line")]
    MissingSize,

    #[error("size line declares {expected} entries, found {found}")]
    EntryCount { expected: u64, found: u64 },
}

/// Malformed `meta.txt` query descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("parse error on line {line}: expected {expected}, found `{found}`")]
    Token {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("descriptor ends early: expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("{what} {value} is out of range (indices are 1-based)")]
    IndexOutOfRange { what: &'static str, value: u64 },
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    MatrixMarket {
        path: PathBuf,
        #[source]
        source: MatrixMarketError,
    },

    #[error("{path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: DescriptorError,
    },

    #[error("{path}: {source}")]
    Matrix {
        path: PathBuf,
        #[source]
        source: MatrixError,
    },

    #[error("not a dataset directory: {0}")]
    NotADataset(PathBuf),

    #[error("query {query}: automaton matrix for label {label} not found at {path}")]
    MissingAutomaton {
        query: u32,
        label: String,
        path: PathBuf,
    },

    #[error("query {query}: {source}")]
    Evaluation {
        query: u32,
        #[source]
        source: RpqError,
    },

    #[error(transparent)]
    Engine(#[from] RpqError),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;
