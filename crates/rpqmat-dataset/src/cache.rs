//! Graph matrices shared by every query of a run.
//!
//! Each label is loaded once. Entries are handed out as `Arc`s, so a query
//! only ever borrows them; nothing a query does can drop a cached matrix.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rayon::prelude::*;
use rpqmat_sparse::BoolMatrix;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::error::{DatasetError, Result};
use crate::matrix_market::read_bool_matrix;

/// A loaded graph matrix, optionally with its transpose.
///
/// The matrix sits behind its own `Arc` so that adding the transpose later
/// shares it with entries handed out before.
#[derive(Debug)]
pub struct CachedGraph {
    pub matrix: Arc<BoolMatrix>,
    pub transposed: Option<BoolMatrix>,
}

impl CachedGraph {
    pub fn new(matrix: BoolMatrix, pretranspose: bool) -> Self {
        let transposed = pretranspose.then(|| matrix.transpose());
        Self {
            matrix: Arc::new(matrix),
            transposed,
        }
    }

    fn with_transpose(&self) -> Self {
        Self {
            matrix: Arc::clone(&self.matrix),
            transposed: Some(self.matrix.transpose()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreloadSummary {
    pub loaded: usize,
    pub absent: Vec<u32>,
    pub failed: Vec<u32>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Label id -> graph matrix. `None` records a label without a graph file.
#[derive(Debug, Default)]
pub struct GraphCache {
    entries: DashMap<u32, Option<Arc<CachedGraph>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of labels looked up so far, absent ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached entry; `None` if the label is absent or was never loaded.
    pub fn get(&self, label_id: u32) -> Option<Arc<CachedGraph>> {
        self.entries.get(&label_id).and_then(|e| e.value().clone())
    }

    pub fn insert(&self, label_id: u32, graph: Option<CachedGraph>) {
        self.entries.insert(label_id, graph.map(Arc::new));
    }

    /// Labels recorded as having no graph file, ascending.
    pub fn absent_labels(&self) -> Vec<u32> {
        let mut absent: Vec<u32> = self
            .entries
            .iter()
            .filter(|e| e.value().is_none())
            .map(|e| *e.key())
            .collect();
        absent.sort_unstable();
        absent
    }

    /// Cached graph for `label_id`, loading it from `dataset` on first use.
    ///
    /// With `pretranspose`, an entry cached without its transpose is
    /// upgraded in place. A missing file yields `Ok(None)` and is remembered;
    /// a malformed file is an error and is not cached.
    pub fn get_or_load(
        &self,
        dataset: &Dataset,
        label_id: u32,
        pretranspose: bool,
    ) -> Result<Option<Arc<CachedGraph>>> {
        let cached = self.entries.get(&label_id).map(|e| e.value().clone());
        match cached {
            Some(None) => return Ok(None),
            Some(Some(graph)) if !pretranspose || graph.transposed.is_some() => {
                return Ok(Some(graph))
            }
            Some(Some(graph)) => {
                let upgraded = Arc::new(graph.with_transpose());
                self.entries.insert(label_id, Some(upgraded.clone()));
                return Ok(Some(upgraded));
            }
            None => {}
        }

        let path = dataset.graph_path(label_id);
        if !path.is_file() {
            debug!(label = label_id, path = %path.display(), "no graph file for label");
            self.entries.insert(label_id, None);
            return Ok(None);
        }

        let matrix = read_bool_matrix(&path)?;
        debug!(
            label = label_id,
            vertices = matrix.nrows(),
            edges = matrix.nvals(),
            pretranspose,
            "loaded graph matrix"
        );
        let graph = Arc::new(CachedGraph::new(matrix, pretranspose));
        // Concurrent loaders of the same label: the first insert wins.
        let entry = self
            .entries
            .entry(label_id)
            .or_insert_with(|| Some(graph.clone()));
        Ok(entry.value().clone().or(Some(graph)))
    }

    /// Load every label in `label_ids` in parallel.
    ///
    /// Labels that fail to load are logged and reported, not fatal: the
    /// queries using them fail on their own when they run.
    pub fn preload(
        &self,
        dataset: &Dataset,
        label_ids: &[u32],
        pretranspose: bool,
    ) -> PreloadSummary {
        let started = Instant::now();
        let results: Vec<(u32, std::result::Result<bool, DatasetError>)> = label_ids
            .par_iter()
            .map(|&id| {
                let loaded = self
                    .get_or_load(dataset, id, pretranspose)
                    .map(|g| g.is_some());
                (id, loaded)
            })
            .collect();

        let mut summary = PreloadSummary::default();
        for (id, result) in results {
            match result {
                Ok(true) => summary.loaded += 1,
                Ok(false) => summary.absent.push(id),
                Err(err) => {
                    warn!(label = id, error = %err, "failed to preload graph matrix");
                    summary.failed.push(id);
                }
            }
        }
        summary.absent.sort_unstable();
        summary.failed.sort_unstable();
        summary.elapsed = started.elapsed();
        debug!(
            loaded = summary.loaded,
            absent = summary.absent.len(),
            failed = summary.failed.len(),
            elapsed = ?summary.elapsed,
            "graph cache preloaded"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dataset_with_graphs(graphs: &[(u32, &str)]) -> (tempfile::TempDir, Dataset) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Graph")).unwrap();
        fs::create_dir(dir.path().join("Queries")).unwrap();
        for (id, text) in graphs {
            fs::write(dir.path().join("Graph").join(format!("{id}.txt")), text).unwrap();
        }
        let ds = Dataset::open(dir.path()).unwrap();
        (dir, ds)
    }

    #[test]
    fn loads_once_and_shares() {
        let (_dir, ds) = dataset_with_graphs(&[(1, "3 3 1\n1 2\n")]);
        let cache = GraphCache::new();
        let a = cache.get_or_load(&ds, 1, false).unwrap().unwrap();
        let b = cache.get_or_load(&ds, 1, false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.transposed.is_none());
        assert!(a.matrix.get(0, 1));
    }

    #[test]
    fn pretranspose_upgrades_entry() {
        let (_dir, ds) = dataset_with_graphs(&[(1, "3 3 1\n1 2\n")]);
        let cache = GraphCache::new();
        cache.get_or_load(&ds, 1, false).unwrap();
        let g = cache.get_or_load(&ds, 1, true).unwrap().unwrap();
        let t = g.transposed.as_ref().unwrap();
        assert!(t.get(1, 0));
        assert!(cache.get(1).unwrap().transposed.is_some());
    }

    #[test]
    fn upgrade_shares_the_loaded_matrix() {
        let (_dir, ds) = dataset_with_graphs(&[(1, "3 3 1
1 2
")]);
        let cache = GraphCache::new();
        let plain = cache.get_or_load(&ds, 1, false).unwrap().unwrap();
        let upgraded = cache.get_or_load(&ds, 1, true).unwrap().unwrap();

        assert!(!Arc::ptr_eq(&plain, &upgraded));
        assert!(Arc::ptr_eq(&plain.matrix, &upgraded.matrix));
        assert_eq!(Arc::strong_count(&plain.matrix), 2);
        assert!(plain.transposed.is_none());
    }

    #[test]
    fn missing_file_is_recorded_absent() {
        let (_dir, ds) = dataset_with_graphs(&[]);
        let cache = GraphCache::new();
        assert!(cache.get_or_load(&ds, 5, false).unwrap().is_none());
        assert_eq!(cache.absent_labels(), vec![5]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn preload_reports_each_outcome() {
        let (_dir, ds) = dataset_with_graphs(&[(1, "2 2 1\n1 2\n"), (2, "2 2 2\n1 1\n")]);
        let cache = GraphCache::new();
        let summary = cache.preload(&ds, &[1, 2, 3], true);
        assert_eq!(summary.loaded, 1);
        assert_eq!(summary.absent, vec![3]);
        assert_eq!(summary.failed, vec![2]);
        assert!(cache.get(1).unwrap().transposed.is_some());
        assert!(cache.get(2).is_none());
    }
}
