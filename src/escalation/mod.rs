//! Escalation routing: upstream graph, system registry, and the
//! breadth-first resolver that turns them into a contact chain.

pub mod graph;
pub mod registry;
pub mod resolve;

pub use graph::{build_upstream_graph, derive_upstream_system, normalize_system_id, UpstreamGraph};
pub use registry::{load_system_registry, parse_registry, Contact, SystemMetadata, SystemRegistry};
pub use resolve::{build_escalation_chain, format_escalation_chain, EscalationStep, DEFAULT_MAX_DEPTH};
