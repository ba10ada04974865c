//! On-disk dataset layout.
//!
//! ```text
//! <root>/Graph/<label>.txt          graph adjacency of one label
//! <root>/Queries/<n>/meta.txt       query descriptor
//! <root>/Queries/<n>/<±label>.txt   automaton transitions of one label
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rpqmat_engine::Label;
use walkdir::WalkDir;

use crate::descriptor::{parse_descriptor, QueryDescriptor};
use crate::error::{DatasetError, Result};

pub const GRAPH_DIR: &str = "Graph";
pub const QUERIES_DIR: &str = "Queries";
pub const DESCRIPTOR_FILE: &str = "meta.txt";

#[derive(Debug, Clone)]
pub struct Dataset {
    root: PathBuf,
}

impl Dataset {
    /// Open a dataset rooted at `root`. Both `Graph/` and `Queries/` must exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(GRAPH_DIR).is_dir() || !root.join(QUERIES_DIR).is_dir() {
            return Err(DatasetError::NotADataset(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_path(&self, label_id: u32) -> PathBuf {
        self.root.join(GRAPH_DIR).join(format!("{label_id}.txt"))
    }

    pub fn query_dir(&self, query: u32) -> PathBuf {
        self.root.join(QUERIES_DIR).join(query.to_string())
    }

    pub fn descriptor_path(&self, query: u32) -> PathBuf {
        self.query_dir(query).join(DESCRIPTOR_FILE)
    }

    /// The automaton file name carries the label's sign.
    pub fn automaton_path(&self, query: u32, label: Label) -> PathBuf {
        self.query_dir(query).join(format!("{label}.txt"))
    }

    /// Numeric query directories in ascending order.
    ///
    /// Entries whose name is not a number are ignored.
    pub fn query_ids(&self) -> Result<Vec<u32>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(self.root.join(QUERIES_DIR))
            .min_depth(1)
            .max_depth(1)
        {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|s| s.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn read_descriptor(&self, query: u32) -> Result<QueryDescriptor> {
        let path = self.descriptor_path(query);
        let text = fs::read_to_string(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        parse_descriptor(&text).map_err(|source| DatasetError::Descriptor { path, source })
    }
}
