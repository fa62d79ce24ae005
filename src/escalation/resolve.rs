//! Breadth-first escalation from a reporting service to its upstreams.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::graph::{build_upstream_graph, normalize_system_id, root_system_id};
use super::registry::{Contact, SystemRegistry};
use crate::artifact::Artifact;
use crate::error::LineageError;

/// Depth limit used when the caller passes zero.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// Reason attached to the starting system.
const START_REASON: &str = "reported_bad_data";

/// One hop in an escalation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    /// Hops from the reporting service.
    pub depth: usize,
    /// Normalized system id.
    pub system_id: String,
    /// Display name from the registry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Owning team from the registry.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    /// Registry contacts, or contacts synthesized from field metadata.
    pub contacts: Vec<Contact>,
    /// `reported_bad_data` or `upstream_of:<system>`.
    pub reason: String,
}

struct Pending {
    system: String,
    depth: usize,
    reason: String,
}

/// Resolves who to contact, working upstream from `service_id`.
///
/// Visits each system at most once and stops expanding at `max_depth`
/// (`0` means [`DEFAULT_MAX_DEPTH`]). Steps are ordered by depth, then id.
///
/// # Errors
///
/// Returns [`LineageError::EmptyServiceId`] for a blank id and
/// [`LineageError::NoSystemsResolved`] if the walk yields nothing.
pub fn build_escalation_chain(
    service_id: &str,
    artifact: &Artifact,
    registry: &SystemRegistry,
    max_depth: usize,
) -> Result<Vec<EscalationStep>, LineageError> {
    let start = normalize_system_id(service_id);
    if start.is_empty() {
        return Err(LineageError::EmptyServiceId);
    }
    let max_depth = if max_depth == 0 { DEFAULT_MAX_DEPTH } else { max_depth };

    let graph = build_upstream_graph(artifact);
    let index = registry.index();
    let fallback = fallback_contacts(artifact);

    let mut queue = VecDeque::from([Pending { system: start, depth: 0, reason: START_REASON.into() }]);
    let mut visited = BTreeSet::new();
    let mut steps = Vec::new();

    while let Some(item) = queue.pop_front() {
        if !visited.insert(item.system.clone()) {
            continue;
        }

        let mut step = EscalationStep {
            depth: item.depth,
            system_id: item.system.clone(),
            name: String::new(),
            owner: String::new(),
            contacts: Vec::new(),
            reason: item.reason,
        };
        if let Some(system) = index.lookup(&item.system) {
            step.name.clone_from(&system.name);
            step.owner.clone_from(&system.owner_team);
            step.contacts.clone_from(&system.escalation);
        }
        if step.contacts.is_empty() {
            let contacts = fallback
                .get(&item.system)
                .or_else(|| fallback.get(&root_system_id(&item.system)));
            if let Some(contacts) = contacts {
                step.contacts.clone_from(contacts);
            }
        }
        tracing::debug!(
            system = %step.system_id,
            depth = step.depth,
            contacts = step.contacts.len(),
            "escalation step"
        );
        steps.push(step);

        if item.depth >= max_depth {
            continue;
        }
        for upstream in graph.neighbors(&item.system) {
            if !visited.contains(upstream) {
                queue.push_back(Pending {
                    system: upstream.to_string(),
                    depth: item.depth + 1,
                    reason: format!("upstream_of:{}", item.system),
                });
            }
        }
    }

    if steps.is_empty() {
        return Err(LineageError::NoSystemsResolved(service_id.to_string()));
    }
    steps.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.system_id.cmp(&b.system_id)));
    tracing::info!(service = %service_id, steps = steps.len(), "escalation chain resolved");
    Ok(steps)
}

/// Contacts observed on fields produced by each system: the first owner and
/// the first escalation channel seen in artifact order. Qualified systems are
/// also indexed under their root id, so `payments` picks up contacts declared
/// by `payments:us` fields.
fn fallback_contacts(artifact: &Artifact) -> BTreeMap<String, Vec<Contact>> {
    let mut owners: BTreeMap<String, Contact> = BTreeMap::new();
    let mut channels: BTreeMap<String, Contact> = BTreeMap::new();

    for field in &artifact.fields {
        let system = normalize_system_id(&field.source_system);
        if system.is_empty() {
            continue;
        }
        let root = root_system_id(&system);
        let keys = if root == system { vec![system] } else { vec![system, root] };

        let owner = field.owner.trim();
        let channel = field.escalation.trim();
        for key in keys {
            if !owner.is_empty() {
                owners.entry(key.clone()).or_insert_with(|| Contact {
                    role: "owner".into(),
                    name: owner.to_string(),
                    channel: String::new(),
                });
            }
            if !channel.is_empty() {
                channels.entry(key).or_insert_with(|| Contact {
                    role: "escalation".into(),
                    name: String::new(),
                    channel: channel.to_string(),
                });
            }
        }
    }

    let mut merged: BTreeMap<String, Vec<Contact>> = BTreeMap::new();
    for (system, contact) in owners.into_iter().chain(channels) {
        merged.entry(system).or_default().push(contact);
    }
    merged
}

/// Formats an escalation chain as a human-readable string.
#[must_use]
pub fn format_escalation_chain(service_id: &str, steps: &[EscalationStep]) -> String {
    let mut lines = vec![format!("Escalation chain for {service_id}:")];
    for step in steps {
        let mut header = format!("  {}. {}", step.depth, step.system_id);
        if !step.name.is_empty() {
            header.push_str(&format!(" ({})", step.name));
        }
        if !step.owner.is_empty() {
            header.push_str(&format!(" owner={}", step.owner));
        }
        header.push_str(&format!(" [{}]", step.reason));
        lines.push(header);
        if step.contacts.is_empty() {
            lines.push("       no contacts known".to_string());
        }
        for contact in &step.contacts {
            let who: Vec<&str> = [contact.name.as_str(), contact.channel.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            lines.push(format!("       {}: {}", contact.role, who.join(" ")));
        }
    }
    lines.join("\n")
}
