//! System registry: who owns each system and how to reach them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::graph::{normalize_system_id, root_system_id};
use crate::context::ServiceContext;
use crate::error::LineageError;

/// An emergency contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Role, e.g. `oncall` or `owner`.
    #[serde(default)]
    pub role: String,
    /// Person or rotation name.
    #[serde(default)]
    pub name: String,
    /// Where to reach them.
    #[serde(default)]
    pub channel: String,
}

/// Ownership metadata for one system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemMetadata {
    /// Unique id, compared after normalization.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Owning team.
    #[serde(default)]
    pub owner_team: String,
    /// Contacts in escalation order.
    #[serde(default)]
    pub escalation: Vec<Contact>,
}

/// Every known system. Validated at load time and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRegistry {
    /// Registered systems.
    #[serde(default)]
    pub systems: Vec<SystemMetadata>,
}

impl SystemRegistry {
    /// Checks that every id is non-empty and unique after normalization.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Registry`] naming the first offending id.
    pub fn validate(&self) -> Result<(), LineageError> {
        let mut seen = BTreeSet::new();
        for system in &self.systems {
            let id = normalize_system_id(&system.id);
            if id.is_empty() {
                return Err(LineageError::Registry("empty id".into()));
            }
            if !seen.insert(id) {
                return Err(LineageError::Registry(format!("duplicate id {:?}", system.id)));
            }
        }
        Ok(())
    }

    /// Index keyed by normalized id.
    #[must_use]
    pub fn index(&self) -> RegistryIndex<'_> {
        RegistryIndex {
            by_id: self.systems.iter().map(|s| (normalize_system_id(&s.id), s)).collect(),
        }
    }
}

/// Normalized-id lookup over a registry.
#[derive(Debug)]
pub struct RegistryIndex<'a> {
    by_id: BTreeMap<String, &'a SystemMetadata>,
}

impl<'a> RegistryIndex<'a> {
    /// Finds a system by exact normalized id, then by its root id.
    #[must_use]
    pub fn lookup(&self, system: &str) -> Option<&'a SystemMetadata> {
        let id = normalize_system_id(system);
        self.by_id.get(&id).or_else(|| self.by_id.get(&root_system_id(&id))).copied()
    }
}

/// Decodes and validates registry YAML.
///
/// # Errors
///
/// Returns [`LineageError::Registry`] for unparsable YAML or an empty or
/// duplicate id.
pub fn parse_registry(yaml: &str) -> Result<SystemRegistry, LineageError> {
    let registry: SystemRegistry = serde_yaml::from_str(yaml)
        .map_err(|e| LineageError::Registry(e.to_string()))?;
    registry.validate()?;
    Ok(registry)
}

/// Reads a registry file through the filesystem port.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_system_registry(
    ctx: &ServiceContext,
    path: &Path,
) -> Result<SystemRegistry, LineageError> {
    let bytes = ctx.fs.read(path).map_err(|e| LineageError::io(path, e))?;
    let yaml = String::from_utf8_lossy(&bytes);
    let registry = parse_registry(&yaml)?;
    tracing::debug!(path = %path.display(), systems = registry.systems.len(), "loaded system registry");
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixedClock, MemoryFileSystem};

    const REGISTRY: &str = "\
systems:
  - id: payments
    name: Payments
    owner_team: team.payments
  - id: Identity
    name: Identity Service
    owner_team: team.identity
    escalation:
      - role: oncall
        name: Bob
        channel: \"#pay-oncall\"
";

    #[test]
    fn parses_registry() {
        let registry = parse_registry(REGISTRY).unwrap();
        assert_eq!(registry.systems.len(), 2);
        assert_eq!(registry.systems[1].escalation[0].channel, "#pay-oncall");
    }

    #[test]
    fn duplicate_normalized_id_is_rejected() {
        let err = parse_registry("systems:\n  - id: payments\n  - id: \" Payments \"\n").unwrap_err();
        assert!(err.to_string().contains("duplicate id"), "{err}");
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = parse_registry("systems:\n  - id: payments\n  - name: nameless\n").unwrap_err();
        assert!(err.to_string().contains("empty id"), "{err}");
    }

    #[test]
    fn unparsable_yaml_is_rejected() {
        let err = parse_registry("systems: [unclosed").unwrap_err();
        assert!(matches!(err, LineageError::Registry(_)));
    }

    #[test]
    fn lookup_normalizes_and_falls_back_to_root() {
        let registry = parse_registry(REGISTRY).unwrap();
        let index = registry.index();
        assert_eq!(index.lookup(" IDENTITY ").map(|s| s.name.as_str()), Some("Identity Service"));
        assert_eq!(index.lookup("identity:eu").map(|s| s.name.as_str()), Some("Identity Service"));
        assert!(index.lookup("ledger").is_none());
    }

    #[test]
    fn load_reads_through_filesystem_port() {
        let ctx = ServiceContext::fixture(
            MemoryFileSystem::new().with_file("systems.yaml", REGISTRY),
            FixedClock::at_date("2026-01-01"),
        );
        let registry = load_system_registry(&ctx, Path::new("systems.yaml")).unwrap();
        assert_eq!(registry.systems[0].id, "payments");

        let missing = load_system_registry(&ctx, Path::new("nope.yaml")).unwrap_err();
        assert!(matches!(missing, LineageError::Io { .. }));
    }
}
