//! Ready-made implementations of the commons traits. Handy in tests and for
//! hosts that do not need anything more elaborate.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::paths::WorkspacePaths;
use crate::sink::OutputSink;

/// Workspace provider backed by a fixed, optional root.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspacePaths {
    root: Option<PathBuf>,
}

impl StaticWorkspacePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Provider for a window with no folder open.
    pub fn empty() -> Self {
        Self { root: None }
    }
}

impl WorkspacePaths for StaticWorkspacePaths {
    fn workspace_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

impl From<&Path> for StaticWorkspacePaths {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Sink that accumulates everything written to it.
#[derive(Debug, Default)]
pub struct MemoryOutputSink {
    chunks: Mutex<Vec<String>>,
}

impl MemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All chunks concatenated in arrival order.
    pub fn contents(&self) -> String {
        self.chunks.lock().concat()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn clear(&self) {
        self.chunks.lock().clear();
    }
}

impl OutputSink for MemoryOutputSink {
    fn write(&self, chunk: &str) {
        self.chunks.lock().push(chunk.to_string());
    }
}
