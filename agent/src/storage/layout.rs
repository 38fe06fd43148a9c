//! Storage layout for materialized stacks

use std::path::{Path, PathBuf};

use crate::models::stack::StackId;

/// Layout of materialized stack manifests under a root directory.
///
/// Each stack owns the directory `<root>/<stack_id>`; the directory is
/// removed recursively when the stack is deleted.
#[derive(Debug, Clone)]
pub struct StackLayout {
    root: PathBuf,
}

impl StackLayout {
    /// Create a new layout rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the layout root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one stack's manifest files
    pub fn stack_dir(&self, id: StackId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Full path of a stack's manifest file
    pub fn manifest_path(&self, id: StackId, file_name: &str) -> PathBuf {
        self.stack_dir(id).join(file_name)
    }
}
