//! Lineage artifact model and persistence.
//!
//! An [`Artifact`] is the point-in-time snapshot of every field annotation
//! found in a codebase. It is built once by [`collect::collect`], ordered by
//! file path then line, and read-only afterwards.

pub mod annotation;
pub mod collect;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::error::LineageError;
use crate::policy::Override;

pub use annotation::{parse_source, ParsedSource};
pub use collect::{collect, CollectOptions, Collection};

/// Current artifact schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Where a source sits relative to the annotated repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Same repository.
    #[default]
    Internal,
    /// Another repository in the same organization.
    CrossRepo,
    /// Third-party provider.
    External,
}

impl Scope {
    /// Wire name of the scope.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::CrossRepo => "cross_repo",
            Self::External => "external",
        }
    }
}

/// Per-field directive controlling how drift on the field is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakPolicy {
    /// Changes are breaking.
    Block,
    /// Changes are advisory.
    Warn,
    /// Changes are informational.
    Allow,
}

impl BreakPolicy {
    /// Wire name of the policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Warn => "warn",
            Self::Allow => "allow",
        }
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "block" => Some(Self::Block),
            "warn" => Some(Self::Warn),
            "allow" => Some(Self::Allow),
            _ => None,
        }
    }
}

impl fmt::Display for BreakPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream origin of a field's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source kind: api, event, db, file, cache, input.
    pub kind: String,
    /// Operation or resource, e.g. `identity.GetUser`.
    pub target: String,
    /// Path inside the target's payload.
    #[serde(default)]
    pub path: String,
    /// Repository scope.
    #[serde(default)]
    pub scope: Scope,
    /// Third-party provider id for external sources.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider_id: String,
    /// Explicit upstream system, overriding target sniffing.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upstream_system: String,
    /// Contract document reference.
    #[serde(default)]
    pub contract_ref: String,
    /// Snapshot date for external sources.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub as_of: String,
}

impl SourceRef {
    /// Identity used to pair sources across snapshots.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}|{}|{}|{}", self.kind, self.target, self.path, self.scope.as_str())
    }
}

/// Lineage metadata for one API output field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Stable identifier, unique within an artifact.
    pub field_id: String,
    /// Previous `field_id`, declared when the field was renamed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub renamed_from: String,
    /// Path expression of the field in the produced payload.
    #[serde(default)]
    pub field: String,
    /// System that produces the field.
    pub source_system: String,
    /// Producer version the annotation was written against.
    #[serde(default)]
    pub source_version: String,
    /// Oldest producer version consumers still accept.
    #[serde(default)]
    pub min_supported_source_version: String,
    /// Upstream origins.
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    /// Owning team.
    #[serde(default)]
    pub owner: String,
    /// Free-text escalation channel.
    #[serde(default)]
    pub escalation: String,
    /// Transform applied to the upstream value.
    #[serde(default)]
    pub transform: String,
    /// How multiple sources are merged.
    #[serde(default)]
    pub merge: String,
    /// Drift policy; absent means fail-closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_policy: Option<BreakPolicy>,
    /// declared or inferred.
    #[serde(default)]
    pub confidence: String,
    /// Data sensitivity class.
    #[serde(default)]
    pub data_classification: String,
    /// Free-form note.
    #[serde(default)]
    pub note: String,
    /// File the annotation was read from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    /// 1-based line of the annotation.
    #[serde(default)]
    pub line: usize,
}

/// A malformed annotation; recorded without aborting collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    /// File containing the annotation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    /// 1-based line.
    pub line: usize,
    /// What was wrong.
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file_path.is_empty() {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}:{}: {}", self.file_path, self.line, self.message)
        }
    }
}

/// Snapshot of all lineage annotations in a codebase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Schema version, currently `"1"`.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Fields in scan order (path, then line).
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Drift overrides declared alongside the annotations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<Override>,
}

impl Default for Artifact {
    fn default() -> Self {
        Self { schema_version: default_schema_version(), fields: Vec::new(), overrides: Vec::new() }
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Artifact {
    /// Creates an artifact from already-ordered fields.
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields, ..Self::default() }
    }

    /// Indexes fields by id.
    #[must_use]
    pub fn by_id(&self) -> BTreeMap<&str, &Field> {
        self.fields.iter().map(|f| (f.field_id.as_str(), f)).collect()
    }

    /// Returns the first field id that appears more than once.
    #[must_use]
    pub fn duplicate_field_id(&self) -> Option<&str> {
        let mut seen = std::collections::BTreeSet::new();
        self.fields.iter().map(|f| f.field_id.as_str()).find(|id| !seen.insert(*id))
    }

    /// Serializes the artifact as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Reads and validates an artifact JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid artifact JSON,
/// or declares the same field id twice.
pub fn load_artifact(ctx: &ServiceContext, path: &Path) -> Result<Artifact, LineageError> {
    let bytes = ctx.fs.read(path).map_err(|e| LineageError::io(path, e))?;
    let artifact: Artifact = serde_json::from_slice(&bytes)
        .map_err(|e| LineageError::Artifact { path: path.to_path_buf(), message: e.to_string() })?;
    if let Some(dup) = artifact.duplicate_field_id() {
        return Err(LineageError::DuplicateField {
            path: path.to_path_buf(),
            field_id: dup.to_string(),
        });
    }
    tracing::debug!(path = %path.display(), fields = artifact.fields.len(), "loaded lineage artifact");
    Ok(artifact)
}

/// Writes an artifact as deterministic pretty JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_artifact(
    ctx: &ServiceContext,
    path: &Path,
    artifact: &Artifact,
) -> Result<(), LineageError> {
    let json = artifact
        .to_json()
        .map_err(|e| LineageError::Artifact { path: path.to_path_buf(), message: e.to_string() })?;
    ctx.fs.write(path, &json).map_err(|e| LineageError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixedClock, MemoryFileSystem};

    fn ctx_with(path: &str, contents: &str) -> ServiceContext {
        ServiceContext::fixture(
            MemoryFileSystem::new().with_file(path, contents),
            FixedClock::at_date("2026-01-01"),
        )
    }

    #[test]
    fn loads_minimal_artifact_and_defaults_schema_version() {
        let ctx = ctx_with(
            "a.json",
            r#"{"fields":[{"field_id":"user_id","source_system":"payments","sources":[
                {"kind":"api","target":"identity.GetUser","path":"id","scope":"cross_repo"}]}]}"#,
        );
        let artifact = load_artifact(&ctx, Path::new("a.json")).unwrap();
        assert_eq!(artifact.schema_version, "1");
        assert_eq!(artifact.fields[0].sources[0].scope, Scope::CrossRepo);
        assert_eq!(artifact.fields[0].break_policy, None);
    }

    #[test]
    fn rejects_duplicate_field_ids() {
        let ctx = ctx_with(
            "a.json",
            r#"{"fields":[{"field_id":"dup","source_system":"a"},{"field_id":"dup","source_system":"b"}]}"#,
        );
        let err = load_artifact(&ctx, Path::new("a.json")).unwrap_err();
        assert!(matches!(err, LineageError::DuplicateField { ref field_id, .. } if field_id == "dup"));
    }

    #[test]
    fn rejects_malformed_json() {
        let ctx = ctx_with("a.json", "{not json");
        let err = load_artifact(&ctx, Path::new("a.json")).unwrap_err();
        assert!(matches!(err, LineageError::Artifact { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let ctx = ctx_with("other.json", "{}");
        let err = load_artifact(&ctx, Path::new("a.json")).unwrap_err();
        assert!(matches!(err, LineageError::Io { .. }));
    }

    #[test]
    fn write_then_load_preserves_break_policy() {
        let ctx = ctx_with("seed", "");
        let artifact = Artifact::new(vec![Field {
            field_id: "user_id".into(),
            source_system: "payments".into(),
            break_policy: Some(BreakPolicy::Warn),
            ..Field::default()
        }]);
        write_artifact(&ctx, Path::new("out/a.json"), &artifact).unwrap();
        let loaded = load_artifact(&ctx, Path::new("out/a.json")).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn break_policy_serializes_lowercase() {
        let json = serde_json::to_string(&BreakPolicy::Allow).unwrap();
        assert_eq!(json, "\"allow\"");
        assert_eq!(BreakPolicy::parse("warn"), Some(BreakPolicy::Warn));
        assert_eq!(BreakPolicy::parse("strict"), None);
    }

    #[test]
    fn parse_error_display_includes_location() {
        let err = ParseError { file_path: "src/a.go".into(), line: 7, message: "bad".into() };
        assert_eq!(err.to_string(), "src/a.go:7: bad");
    }
}
