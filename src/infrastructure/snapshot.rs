//! Project snapshot files
//!
//! A snapshot is the nested hierarchy view serialized as JSON. Loading
//! validates it through [`TreeBuilder`]; saving writes pretty-printed JSON.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{CalculatorRecord, CalculatorTree, CalculatorView, TreeBuilder};
use crate::infrastructure::error::{InfraError, InfraResult};
use crate::infrastructure::traits::FileSystem;

/// Accepted on-disk layouts: one nested root, or a flat list of rows.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Nested(CalculatorView),
    Flat(Vec<CalculatorRecord>),
}

pub struct SnapshotStore {
    fs: Arc<dyn FileSystem>,
}

impl SnapshotStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> InfraResult<CalculatorTree> {
        if !self.fs.exists(path) {
            return Err(InfraError::SnapshotNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
        let tree = Self::parse(&content).map_err(|e| match e {
            ParseFailure::Json(source) => InfraError::Snapshot {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Tree(e) => InfraError::from(e),
        })?;
        debug!("loaded {} calculators from {}", tree.len(), path.display());
        Ok(tree)
    }

    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, path: &Path, tree: &CalculatorTree) -> InfraResult<()> {
        let content = serde_json::to_string_pretty(&tree.to_view()).map_err(|source| {
            InfraError::Snapshot {
                path: path.to_path_buf(),
                source,
            }
        })?;
        self.fs
            .ensure_parent(path)
            .map_err(|e| InfraError::io(format!("create parent of {}", path.display()), e))?;
        self.fs
            .write(path, &content)
            .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
        debug!("saved {} calculators to {}", tree.len(), path.display());
        Ok(())
    }

    fn parse(content: &str) -> Result<CalculatorTree, ParseFailure> {
        let mut builder = TreeBuilder::new();
        let built = match serde_json::from_str::<SnapshotFile>(content).map_err(ParseFailure::Json)? {
            SnapshotFile::Nested(view) => builder.build_from_view(view),
            SnapshotFile::Flat(records) => builder.build_from_records(records),
        };
        built.map_err(ParseFailure::Tree)
    }
}

enum ParseFailure {
    Json(serde_json::Error),
    Tree(crate::domain::DomainError),
}
