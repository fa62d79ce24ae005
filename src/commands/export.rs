//! `lineage export` command.

use std::path::{Path, PathBuf};

use crate::artifact::{collect, write_artifact, CollectOptions};
use crate::context::ServiceContext;
use crate::error::LineageError;
use crate::Outcome;

/// Scans `paths` and writes the artifact to `out`.
///
/// Malformed annotations are reported on stderr and do not fail the export.
///
/// # Errors
///
/// Returns an error if a path cannot be read or the artifact cannot be written.
pub fn run(
    ctx: &ServiceContext,
    out: &Path,
    paths: &[PathBuf],
    workers: Option<usize>,
) -> Result<Outcome, LineageError> {
    let collection = collect(ctx, paths, &CollectOptions { workers })?;
    for error in &collection.errors {
        eprintln!("lineage parse error: {error}");
    }
    write_artifact(ctx, out, &collection.artifact)?;
    println!(
        "Exported {} field(s) to {} ({} parse error(s))",
        collection.artifact.fields.len(),
        out.display(),
        collection.errors.len()
    );
    Ok(Outcome::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixedClock, MemoryFileSystem};
    use crate::artifact::load_artifact;

    #[test]
    fn writes_artifact_despite_parse_errors() {
        let fs = MemoryFileSystem::new().with_file(
            "svc/user.go",
            "// lineage:source field_id=user_id source_system=payments sources=api:identity.GetUser#id\n\
             // lineage:source field_id=BAD source_system=payments sources=api:identity.GetUser#id\n",
        );
        let ctx = ServiceContext::fixture(fs, FixedClock::at_date("2026-01-01"));
        let outcome = run(&ctx, Path::new("out/lineage.json"), &[PathBuf::from("svc")], None).unwrap();
        assert_eq!(outcome, Outcome::Pass);

        let artifact = load_artifact(&ctx, Path::new("out/lineage.json")).unwrap();
        assert_eq!(artifact.fields.len(), 1);
        assert_eq!(artifact.fields[0].file_path, "svc/user.go");
    }

    #[test]
    fn unreadable_source_fails_without_writing() {
        let fs = MemoryFileSystem::new()
            .with_file("svc/ok.go", "// nothing\n")
            .with_unreadable("svc/broken.go");
        let ctx = ServiceContext::fixture(fs, FixedClock::at_date("2026-01-01"));
        let err = run(&ctx, Path::new("out.json"), &[PathBuf::from("svc")], Some(1)).unwrap_err();
        assert!(matches!(err, LineageError::Io { .. }));
        assert!(!ctx.fs.exists(Path::new("out.json")));
    }
}
