//! System-to-system dependency graph derived from source references.

use std::collections::{BTreeMap, BTreeSet};

use crate::artifact::{Artifact, Scope, SourceRef};

/// Lowercases and trims a system id.
#[must_use]
pub fn normalize_system_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized id with any `:qualifier` suffix removed.
#[must_use]
pub fn root_system_id(raw: &str) -> String {
    let id = normalize_system_id(raw);
    match id.split_once(':') {
        Some((root, _)) if !root.is_empty() => root.to_string(),
        _ => id,
    }
}

/// Derives the system a source reference reads from.
///
/// Priority: explicit `upstream_system`, then `provider_id` on an external
/// source, then the text of `target` before its first `.` or `/`. The
/// target fallback applies to every source kind, so `db:profiles.users`
/// yields `profiles`; pin `upstream_system` when that guess is wrong. A
/// target that starts with a delimiter derives nothing.
/// Returns an empty string when nothing can be derived.
#[must_use]
pub fn derive_upstream_system(source: &SourceRef) -> String {
    let explicit = source.upstream_system.trim();
    if !explicit.is_empty() {
        return normalize_system_id(explicit);
    }
    let provider = source.provider_id.trim();
    if source.scope == Scope::External && !provider.is_empty() {
        return normalize_system_id(provider);
    }
    let target = source.target.trim();
    let head = target.split(['.', '/']).next().unwrap_or_default();
    normalize_system_id(head)
}

/// Directed adjacency from a system to the systems it reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl UpstreamGraph {
    fn add_edge(&mut self, from: String, to: String) {
        if from.is_empty() || to.is_empty() || from == to {
            return;
        }
        self.edges.entry(from).or_default().insert(to);
    }

    /// Upstream systems of `system`, sorted.
    pub fn neighbors(&self, system: &str) -> impl Iterator<Item = &str> {
        self.edges.get(system).into_iter().flatten().map(String::as_str)
    }

    /// Systems with at least one outgoing edge, sorted.
    pub fn systems(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Total number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

/// Builds the upstream graph of an artifact.
///
/// Each derived pair adds a fine edge between normalized ids and a coarse
/// edge between their roots, so `payments:eu -> identity:us` also yields
/// `payments -> identity`.
#[must_use]
pub fn build_upstream_graph(artifact: &Artifact) -> UpstreamGraph {
    let mut graph = UpstreamGraph::default();
    for field in &artifact.fields {
        let from = normalize_system_id(&field.source_system);
        if from.is_empty() {
            continue;
        }
        for source in &field.sources {
            let upstream = derive_upstream_system(source);
            if upstream.is_empty() || upstream == from {
                continue;
            }
            graph.add_edge(root_system_id(&from), root_system_id(&upstream));
            graph.add_edge(from.clone(), upstream);
        }
    }
    tracing::debug!(
        systems = graph.edges.len(),
        edges = graph.edge_count(),
        "built upstream graph"
    );
    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Field;

    fn src(kind: &str, target: &str) -> SourceRef {
        SourceRef { kind: kind.into(), target: target.into(), ..SourceRef::default() }
    }

    #[test]
    fn derive_prefers_explicit_upstream_system() {
        let mut s = src("api", "identity.GetUser");
        s.upstream_system = "  Accounts:EU ".into();
        s.scope = Scope::External;
        s.provider_id = "stripe".into();
        assert_eq!(derive_upstream_system(&s), "accounts:eu");
    }

    #[test]
    fn derive_uses_provider_only_for_external_scope() {
        let mut s = src("api", "charges.Create");
        s.provider_id = "Stripe".into();
        s.scope = Scope::External;
        assert_eq!(derive_upstream_system(&s), "stripe");

        s.scope = Scope::CrossRepo;
        assert_eq!(derive_upstream_system(&s), "charges");
    }

    #[test]
    fn derive_splits_target_on_first_delimiter() {
        let cases = [
            ("identity.GetUser", "identity"),
            ("Identity.v2.GetUser", "identity"),
            ("ledger/v1/totals", "ledger"),
            ("ledger/v1.totals", "ledger"),
            ("users.profile/extra", "users"),
            ("/billing/invoices", ""),
            ("standalone", "standalone"),
            ("  spaced.op ", "spaced"),
            ("", ""),
            ("./", ""),
        ];
        for (target, expected) in cases {
            assert_eq!(derive_upstream_system(&src("api", target)), expected, "target {target:?}");
        }
    }

    #[test]
    fn derive_applies_to_every_kind() {
        assert_eq!(derive_upstream_system(&src("db", "users.profile")), "users");
        assert_eq!(derive_upstream_system(&src("event", "orders/created")), "orders");
        assert_eq!(derive_upstream_system(&src("db", "profiles.users")), "profiles");
    }

    #[test]
    fn root_strips_qualifier() {
        assert_eq!(root_system_id(" Payments:EU "), "payments");
        assert_eq!(root_system_id("payments"), "payments");
        assert_eq!(root_system_id(":odd"), ":odd");
    }

    fn field(system: &str, targets: &[&str]) -> Field {
        Field {
            field_id: format!("f_{}", system.replace(':', "_")),
            source_system: system.into(),
            sources: targets.iter().map(|t| src("api", t)).collect(),
            ..Field::default()
        }
    }

    #[test]
    fn builds_fine_and_root_edges_without_self_loops() {
        let mut qualified = src("api", "ignored.op");
        qualified.upstream_system = "identity:us".into();
        let mut f = field("Payments:EU", &["payments.Internal", "ledger/v1"]);
        f.sources.push(qualified);
        let graph = build_upstream_graph(&Artifact::new(vec![f]));

        let from_fine: Vec<&str> = graph.neighbors("payments:eu").collect();
        assert_eq!(from_fine, vec!["identity:us", "ledger", "payments"]);
        let from_root: Vec<&str> = graph.neighbors("payments").collect();
        assert_eq!(from_root, vec!["identity", "ledger"]);
        assert_eq!(graph.neighbors("identity").count(), 0);
    }

    #[test]
    fn deduplicates_edges() {
        let graph = build_upstream_graph(&Artifact::new(vec![
            field("payments", &["identity.GetUser", "identity.ListUsers"]),
            field("payments", &["identity/v1"]),
        ]));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.systems().collect::<Vec<_>>(), vec!["payments"]);
    }
}
