//! Policy gate: overrides, expiry, and the warn/block decision.

pub mod gate;
pub mod overrides;

pub use gate::{
    evaluate, format_gate_decision, AuditEntry, AuditEvent, FindingStatus, GateConfig,
    GateDecision, GatedFinding, Mode,
};
pub use overrides::{is_known_kind, load_overrides, parse_expiry, Override, ANY_KIND};
