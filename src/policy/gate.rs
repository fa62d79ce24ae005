//! Gate evaluation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Override;
use crate::drift::{DriftFinding, DriftReport};

/// How breaking drift affects the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report everything, always pass.
    Warn,
    /// Fail on any active breaking finding.
    #[default]
    Block,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warn => "warn",
            Self::Block => "block",
        })
    }
}

/// Gate settings for one evaluation.
#[derive(Debug, Clone, Default)]
pub struct GateConfig {
    /// Decision mode.
    pub mode: Mode,
    /// Candidate overrides, active or not.
    pub overrides: Vec<Override>,
}

/// Whether a finding still counts toward the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// Counts toward the decision.
    Active,
    /// Suppressed by an unexpired override; still reported.
    Overridden,
}

/// A finding annotated with its gate status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatedFinding {
    /// The classified finding.
    #[serde(flatten)]
    pub finding: DriftFinding,
    /// Gate status.
    pub status: FindingStatus,
    /// Override that suppressed the finding.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "override")]
    pub applied: Option<Override>,
}

/// Audit trail event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    /// An override suppressed a breaking finding.
    OverrideApplied,
    /// A matching override had expired; the finding stays active.
    OverrideExpired,
}

/// One override decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// What happened.
    pub event: AuditEvent,
    /// Affected field.
    pub field_id: String,
    /// Finding kind.
    pub kind: String,
    /// Override owner.
    pub owner: String,
    /// Override reason.
    pub reason: String,
    /// Override expiry as declared.
    pub expires_at: String,
}

impl AuditEntry {
    fn new(event: AuditEvent, finding: &DriftFinding, ov: &Override) -> Self {
        Self {
            event,
            field_id: finding.field_id.clone(),
            kind: finding.kind.as_str().to_string(),
            owner: ov.owner.clone(),
            reason: ov.reason.clone(),
            expires_at: ov.expires_at.clone(),
        }
    }
}

/// Outcome of gating a drift report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    /// Mode the decision was made in.
    pub mode: Mode,
    /// `false` only in block mode with active breaking findings.
    pub passed: bool,
    /// Active breaking findings after overrides.
    pub blocking: usize,
    /// Every finding, in report order.
    pub findings: Vec<GatedFinding>,
    /// Override decisions in finding order.
    pub audit: Vec<AuditEntry>,
}

/// Applies overrides and the mode to a drift report.
///
/// Only breaking findings are eligible for overrides. Among matching
/// overrides, the first active one (sorted by field, kind, expiry) wins.
/// A finding matched only by expired overrides stays active and is audited
/// as `override_expired`.
#[must_use]
pub fn evaluate(report: &DriftReport, config: &GateConfig, now: DateTime<Utc>) -> GateDecision {
    let mut candidates: Vec<&Override> = config.overrides.iter().collect();
    candidates.sort_by(|a, b| {
        (a.id.as_str(), a.kind.as_str(), a.expires_at.as_str(), a.reason.as_str())
            .cmp(&(b.id.as_str(), b.kind.as_str(), b.expires_at.as_str(), b.reason.as_str()))
    });

    let mut findings = Vec::with_capacity(report.findings.len());
    let mut audit = Vec::new();
    let mut blocking = 0;

    for finding in &report.findings {
        let mut gated =
            GatedFinding { finding: finding.clone(), status: FindingStatus::Active, applied: None };

        if finding.severity.is_breaking() {
            let matching: Vec<&Override> =
                candidates.iter().copied().filter(|ov| ov.matches(finding)).collect();
            if let Some(active) = matching.iter().find(|ov| ov.is_active_at(now)) {
                tracing::info!(
                    field_id = %finding.field_id,
                    kind = %finding.kind,
                    owner = %active.owner,
                    expires_at = %active.expires_at,
                    "override applied"
                );
                audit.push(AuditEntry::new(AuditEvent::OverrideApplied, finding, active));
                gated.status = FindingStatus::Overridden;
                gated.applied = Some((*active).clone());
            } else if let Some(expired) = matching.first() {
                tracing::warn!(
                    field_id = %finding.field_id,
                    kind = %finding.kind,
                    expires_at = %expired.expires_at,
                    "override expired, finding re-activated"
                );
                audit.push(AuditEntry::new(AuditEvent::OverrideExpired, finding, expired));
            }
            if gated.status == FindingStatus::Active {
                blocking += 1;
            }
        }
        findings.push(gated);
    }

    let passed = match config.mode {
        Mode::Warn => true,
        Mode::Block => blocking == 0,
    };
    tracing::info!(mode = %config.mode, passed, blocking, "gate evaluated");

    GateDecision { mode: config.mode, passed, blocking, findings, audit }
}

/// Formats a gate decision as a human-readable string.
#[must_use]
pub fn format_gate_decision(decision: &GateDecision) -> String {
    let mut lines = Vec::new();
    for gated in &decision.findings {
        let f = &gated.finding;
        let marker = match gated.status {
            FindingStatus::Active => String::new(),
            FindingStatus::Overridden => " [overridden]".to_string(),
        };
        lines.push(format!(
            "[{}] {} {} ({}): {}{marker}",
            f.severity.as_str().to_ascii_uppercase(),
            f.field_id,
            f.kind,
            f.attribute,
            f.message
        ));
    }
    for entry in &decision.audit {
        let event = match entry.event {
            AuditEvent::OverrideApplied => "override applied",
            AuditEvent::OverrideExpired => "override expired",
        };
        lines.push(format!(
            "audit: {event} for {} {} (owner {}, expires {}): {}",
            entry.field_id,
            entry.kind,
            if entry.owner.is_empty() { "-" } else { &entry.owner },
            entry.expires_at,
            entry.reason
        ));
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} finding(s), {} blocking, mode {}: {}",
        decision.findings.len(),
        decision.blocking,
        decision.mode,
        if decision.passed { "PASS" } else { "FAIL" }
    ));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drift::{FindingKind, Severity};

    fn finding(field_id: &str, kind: FindingKind, severity: Severity) -> DriftFinding {
        DriftFinding {
            field_id: field_id.into(),
            kind,
            severity,
            attribute: "field".into(),
            before: String::new(),
            after: String::new(),
            message: "m".into(),
        }
    }

    fn ov(id: &str, kind: &str, expires: &str) -> Override {
        Override {
            id: id.into(),
            kind: kind.into(),
            reason: "planned".into(),
            owner: "team.payments".into(),
            expires_at: expires.into(),
            ticket: String::new(),
            file_path: String::new(),
            line: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        crate::adapters::fixture::FixedClock::at_date("2026-03-01").0
    }

    fn report() -> DriftReport {
        DriftReport::from_findings(vec![
            finding("user_id", FindingKind::Removed, Severity::Block),
            finding("total_cents", FindingKind::Changed, Severity::Warn),
            finding("locale", FindingKind::Added, Severity::Info),
        ])
    }

    #[test]
    fn block_mode_fails_on_breaking_finding() {
        let decision = evaluate(&report(), &GateConfig { mode: Mode::Block, overrides: vec![] }, now());
        assert!(!decision.passed);
        assert_eq!(decision.blocking, 1);
        assert_eq!(decision.findings.len(), 3);
        assert!(decision.audit.is_empty());
    }

    #[test]
    fn warn_mode_always_passes_and_reports_everything() {
        let decision = evaluate(&report(), &GateConfig { mode: Mode::Warn, overrides: vec![] }, now());
        assert!(decision.passed);
        assert_eq!(decision.blocking, 1);
        assert_eq!(decision.findings.len(), 3);
    }

    #[test]
    fn active_override_suppresses_and_audits() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("user_id", "removed", "2026-06-30")],
        };
        let decision = evaluate(&report(), &config, now());
        assert!(decision.passed);
        assert_eq!(decision.findings[0].status, FindingStatus::Overridden);
        assert!(decision.findings[0].applied.is_some());
        assert_eq!(decision.audit.len(), 1);
        assert_eq!(decision.audit[0].event, AuditEvent::OverrideApplied);
    }

    #[test]
    fn expired_override_behaves_like_no_override() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("user_id", "*", "2026-02-28")],
        };
        let with = evaluate(&report(), &config, now());
        let without = evaluate(&report(), &GateConfig::default(), now());
        assert_eq!(with.passed, without.passed);
        assert_eq!(with.findings, without.findings);
        assert_eq!(with.audit.len(), 1);
        assert_eq!(with.audit[0].event, AuditEvent::OverrideExpired);
    }

    #[test]
    fn active_override_wins_over_expired_one() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("user_id", "*", "2026-01-01"), ov("user_id", "removed", "2027-01-01")],
        };
        let decision = evaluate(&report(), &config, now());
        assert!(decision.passed);
        assert_eq!(decision.audit.len(), 1);
        assert_eq!(decision.audit[0].event, AuditEvent::OverrideApplied);
        assert_eq!(decision.audit[0].expires_at, "2027-01-01");
    }

    #[test]
    fn non_breaking_findings_are_not_overridden() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("total_cents", "*", "2027-01-01")],
        };
        let decision = evaluate(&report(), &config, now());
        let total = decision.findings.iter().find(|g| g.finding.field_id == "total_cents").unwrap();
        assert_eq!(total.status, FindingStatus::Active);
        assert!(decision.audit.is_empty());
    }

    #[test]
    fn override_for_other_kind_does_not_match() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("user_id", "changed", "2027-01-01")],
        };
        assert!(!evaluate(&report(), &config, now()).passed);
    }

    #[test]
    fn formats_decision() {
        let config = GateConfig {
            mode: Mode::Block,
            overrides: vec![ov("user_id", "removed", "2026-06-30")],
        };
        let text = format_gate_decision(&evaluate(&report(), &config, now()));
        assert!(text.contains("[BLOCK] user_id removed (field): m [overridden]"));
        assert!(text.contains("audit: override applied for user_id removed (owner team.payments"));
        assert!(text.ends_with("3 finding(s), 0 blocking, mode block: PASS"));
    }
}
