//! Filesystem port for source trees and lineage files.

use std::path::Path;

/// Whether a directory entry should be descended into or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A directory (symlinks to directories included).
    Dir,
    /// Anything else, including dangling symlinks.
    File,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name relative to the listed directory.
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
}

/// Provides filesystem access for the collector and the file loaders.
///
/// Abstracting the filesystem lets collection run against an in-memory tree
/// in tests without touching the real disk.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or a dangling link.
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists (dangling links count as existing).
    fn exists(&self, path: &Path) -> bool;

    /// Returns `true` if the path resolves to a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists the entries of a directory, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a directory or cannot be read.
    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>>;
}
