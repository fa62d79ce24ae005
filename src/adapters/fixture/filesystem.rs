//! In-memory filesystem keyed by path.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ports::filesystem::{DirEntry, EntryKind, FileSystem};

/// In-memory filesystem for exercising the collector without touching disk.
///
/// Directories are implied by file paths. Paths registered with
/// [`MemoryFileSystem::with_unreadable`] appear in listings but fail on read,
/// standing in for dangling links and permission errors.
#[derive(Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    unreadable: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given contents.
    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, contents: &str) -> Self {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), contents.to_string());
        }
        self
    }

    /// Adds a file that is listed but cannot be read.
    #[must_use]
    pub fn with_unreadable(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.unreadable.insert(path.clone());
        self.with_file(path, "")
    }

    /// Returns the contents last written to `path`, if any.
    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files.lock().ok().and_then(|files| files.get(path).cloned())
    }

    fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().map(|files| files.keys().cloned().collect()).unwrap_or_default()
    }
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        if self.unreadable.contains(path) {
            return Err(format!("permission denied: {}", path.display()).into());
        }
        self.contents(path)
            .map(String::into_bytes)
            .ok_or_else(|| format!("no such file: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut files = self.files.lock().map_err(|e| e.to_string())?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.contents(path).is_some() || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.paths().iter().any(|p| p != path && p.starts_with(path))
    }

    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>> {
        if !self.is_dir(path) {
            return Err(format!("not a directory: {}", path.display()).into());
        }
        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for file in self.paths() {
            let Ok(rest) = file.strip_prefix(path) else {
                continue;
            };
            let mut parts = rest.components();
            let Some(first) = parts.next() else {
                continue;
            };
            let name = first.as_os_str().to_string_lossy().into_owned();
            let kind = if parts.next().is_some() { EntryKind::Dir } else { EntryKind::File };
            children.entry(name).or_insert(kind);
        }
        Ok(children.into_iter().map(|(name, kind)| DirEntry { name, kind }).collect())
    }
}
