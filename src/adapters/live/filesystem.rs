//! Live filesystem adapter using `std::fs`.

use std::path::Path;

use crate::ports::filesystem::{DirEntry, EntryKind, FileSystem};

/// Live filesystem adapter backed by real disk I/O.
pub struct LiveFileSystem;

impl FileSystem for LiveFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(std::fs::read(path)?)
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(std::fs::write(path, contents)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(
        &self,
        path: &Path,
    ) -> Result<Vec<DirEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            // Links are never followed: a linked directory or a dangling link
            // lands in `File`, so the walk cannot loop and a bad link to a
            // source file fails loudly when read.
            let kind = if entry.file_type()?.is_dir() { EntryKind::Dir } else { EntryKind::File };
            entries.push(DirEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}
