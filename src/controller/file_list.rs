//! Ordered, de-duplicated list of input files.
//!
//! The display names shown to the user and the backing paths are kept as two
//! parallel lists; every mutation touches both so that index `i` always
//! refers to the same file in each.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct FileList {
    paths: Vec<PathBuf>,
    display: Vec<String>,
}

impl FileList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present. Returns whether it was
    /// added.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.contains(&path) {
            tracing::debug!("Ignoring duplicate input {}", path.display());
            return false;
        }
        self.display.push(display_name(&path));
        self.paths.push(path);
        true
    }

    /// Append every path not already present, in order. Returns how many
    /// were added.
    pub fn add_all(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        paths.into_iter().filter(|p| self.add(p.clone())).count()
    }

    /// Remove the entry at `index`, returning its path. Out of range is a
    /// no-op.
    pub fn remove_at(&mut self, index: usize) -> Option<PathBuf> {
        if index >= self.paths.len() {
            return None;
        }
        self.display.remove(index);
        Some(self.paths.remove(index))
    }

    pub fn clear(&mut self) {
        self.paths.clear();
        self.display.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Base names, in list order.
    pub fn display_names(&self) -> &[String] {
        &self.display
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
