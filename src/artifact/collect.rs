//! Annotation collector: walks source trees and assembles an [`Artifact`].
//!
//! Directory listing is sequential and sorted; per-file parsing fans out on a
//! rayon pool with no shared state between files. Results are merged by
//! sorting on `(path, line)`, never by completion order, so re-scanning an
//! unchanged tree yields a byte-identical artifact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::annotation::{parse_source, ParsedSource};
use super::{Artifact, Field, ParseError};
use crate::context::ServiceContext;
use crate::error::LineageError;
use crate::policy::Override;
use crate::ports::filesystem::EntryKind;

/// File extensions the language adapters understand.
pub const SOURCE_EXTENSIONS: &[&str] = &["go", "ts", "tsx", "js", "jsx", "py", "java", "kt", "rs"];

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] =
    &[".git", "node_modules", "bin", "vendor", "third_party", "target", ".venv", "__pycache__"];

/// Tuning for a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Parser worker count; `None` uses the global rayon pool.
    pub workers: Option<usize>,
}

/// Output of a collection run: the artifact plus every malformed annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    /// The assembled artifact.
    pub artifact: Artifact,
    /// Malformed annotations, sorted by file then line.
    pub errors: Vec<ParseError>,
}

struct FileScan {
    path: String,
    parsed: ParsedSource,
}

/// Scans `roots` (default `.`) and builds a deterministic artifact.
///
/// Malformed annotations are returned in [`Collection::errors`] and do not
/// stop the run. An unreadable candidate file aborts the whole collection.
///
/// # Errors
///
/// Returns an error if a root does not exist, a directory cannot be listed,
/// a candidate file cannot be read, the worker pool cannot be built, or the
/// context's cancel flag is raised.
pub fn collect(
    ctx: &ServiceContext,
    roots: &[PathBuf],
    options: &CollectOptions,
) -> Result<Collection, LineageError> {
    let default_root = [PathBuf::from(".")];
    let roots = if roots.is_empty() { &default_root[..] } else { roots };

    let mut candidates = Vec::new();
    for root in roots {
        discover(ctx, root, &mut candidates)?;
    }
    candidates.sort();
    candidates.dedup();
    tracing::debug!(files = candidates.len(), "lineage candidates discovered");

    let scans = match options.workers {
        Some(workers) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| LineageError::Usage(format!("cannot start {workers} workers: {e}")))?;
            pool.install(|| scan_all(ctx, &candidates))?
        }
        None => scan_all(ctx, &candidates)?,
    };

    let collection = merge(scans);
    tracing::info!(
        files = candidates.len(),
        fields = collection.artifact.fields.len(),
        overrides = collection.artifact.overrides.len(),
        parse_errors = collection.errors.len(),
        "lineage collection finished"
    );
    Ok(collection)
}

fn discover(
    ctx: &ServiceContext,
    root: &Path,
    candidates: &mut Vec<PathBuf>,
) -> Result<(), LineageError> {
    ctx.cancel.check()?;
    if !ctx.fs.exists(root) {
        return Err(LineageError::io(root, "path does not exist".into()));
    }
    if !ctx.fs.is_dir(root) {
        if is_source_file(root) {
            candidates.push(root.to_path_buf());
        }
        return Ok(());
    }

    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        ctx.cancel.check()?;
        let entries = ctx.fs.list_dir(&dir).map_err(|e| LineageError::io(&dir, e))?;
        for entry in entries {
            let path = dir.join(&entry.name);
            match entry.kind {
                EntryKind::Dir if IGNORED_DIRS.contains(&entry.name.as_str()) => {}
                EntryKind::Dir => pending.push(path),
                EntryKind::File if is_source_file(&path) => candidates.push(path),
                EntryKind::File => {}
            }
        }
    }
    Ok(())
}

fn scan_all(ctx: &ServiceContext, candidates: &[PathBuf]) -> Result<Vec<FileScan>, LineageError> {
    candidates.par_iter().map(|path| scan_file(ctx, path)).collect()
}

fn scan_file(ctx: &ServiceContext, path: &Path) -> Result<FileScan, LineageError> {
    ctx.cancel.check()?;
    let bytes = ctx.fs.read(path).map_err(|e| LineageError::io(path, e))?;
    let parsed = parse_source(&String::from_utf8_lossy(&bytes));
    Ok(FileScan { path: canonical_path(path), parsed })
}

fn merge(mut scans: Vec<FileScan>) -> Collection {
    scans.sort_by(|a, b| a.path.cmp(&b.path));

    let mut fields: Vec<Field> = Vec::new();
    let mut overrides: Vec<Override> = Vec::new();
    let mut errors: Vec<ParseError> = Vec::new();
    let mut first_seen: BTreeMap<String, (String, usize)> = BTreeMap::new();

    for scan in scans {
        let ParsedSource { fields: parsed_fields, overrides: parsed_overrides, errors: parsed_errors } =
            scan.parsed;

        for mut field in parsed_fields {
            field.file_path.clone_from(&scan.path);
            if let Some((path, line)) = first_seen.get(&field.field_id) {
                errors.push(ParseError {
                    file_path: scan.path.clone(),
                    line: field.line,
                    message: format!(
                        "duplicate field_id {:?} (first declared at {path}:{line})",
                        field.field_id
                    ),
                });
                continue;
            }
            first_seen.insert(field.field_id.clone(), (scan.path.clone(), field.line));
            fields.push(field);
        }
        overrides.extend(parsed_overrides.into_iter().map(|mut ov| {
            ov.file_path.clone_from(&scan.path);
            ov
        }));
        errors.extend(parsed_errors.into_iter().map(|mut err| {
            err.file_path.clone_from(&scan.path);
            err
        }));
    }

    fields.sort_by(|a, b| (&a.file_path, a.line).cmp(&(&b.file_path, b.line)));
    overrides.sort_by(|a, b| {
        (&a.id, &a.kind, &a.expires_at, &a.file_path, a.line)
            .cmp(&(&b.id, &b.kind, &b.expires_at, &b.file_path, b.line))
    });
    errors.sort_by(|a, b| (&a.file_path, a.line).cmp(&(&b.file_path, b.line)));

    Collection { artifact: Artifact { overrides, ..Artifact::new(fields) }, errors }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn canonical_path(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    display.strip_prefix("./").map(String::from).unwrap_or(display)
}
