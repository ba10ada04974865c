//! Datasets of labeled graphs and regular path queries.
//!
//! - [`matrix_market`]: coordinate-format matrix files
//! - [`descriptor`]: `meta.txt` query descriptors and their resolution into
//!   engine inputs
//! - [`Dataset`]: the `Graph/` + `Queries/` directory layout
//! - [`GraphCache`]: graph matrices shared across queries
//! - [`QueryRunner`]: load, evaluate and extract, one query or a batch

pub mod cache;
pub mod dataset;
pub mod descriptor;
mod error;
pub mod matrix_market;
pub mod runner;

pub use cache::{CachedGraph, GraphCache, PreloadSummary};
pub use dataset::Dataset;
pub use descriptor::{parse_descriptor, QueryDescriptor, ResolvedQuery};
pub use error::{DatasetError, DescriptorError, MatrixMarketError, Result};
pub use matrix_market::{parse_matrix_market, read_bool_matrix, read_matrix_market, CoordinateMatrix};
pub use runner::{
    BenchReport, EngineKind, LoadedQuery, QueryEvent, QueryOutcome, QueryRunner, RunnerConfig,
    SkippedQuery,
};
