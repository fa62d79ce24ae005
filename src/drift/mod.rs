//! Drift classification between two lineage artifacts.
//!
//! The classifier pairs fields by `field_id` and emits severity-tagged
//! findings in a total order, so identical inputs always produce identical
//! reports. Breaking drift is a result, never an error.

pub mod classify;
pub mod version;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::artifact::BreakPolicy;

pub use classify::diff_artifacts;
pub use version::compare_versions;

/// What happened to a field between snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    /// Present only in the current artifact.
    Added,
    /// Present in both with a differing attribute.
    Changed,
    /// Present only in the baseline artifact.
    Removed,
    /// Current producer version fell below the baseline's supported floor.
    StaleSource,
}

impl FindingKind {
    /// Every kind, in wire-name order.
    pub const ALL: [Self; 4] = [Self::Added, Self::Changed, Self::Removed, Self::StaleSource];

    /// Wire name, also used to match overrides.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
            Self::StaleSource => "stale-source",
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact of a finding. Ordered `Info < Warn < Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational.
    Info,
    /// Advisory.
    Warn,
    /// Breaking; fails the gate in block mode.
    Block,
}

impl Severity {
    /// Severity for a change under the given policy. No policy fails closed.
    #[must_use]
    pub fn for_policy(policy: Option<BreakPolicy>) -> Self {
        match policy {
            None | Some(BreakPolicy::Block) => Self::Block,
            Some(BreakPolicy::Warn) => Self::Warn,
            Some(BreakPolicy::Allow) => Self::Info,
        }
    }

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Block => "block",
        }
    }

    /// Returns `true` for breaking findings.
    #[must_use]
    pub fn is_breaking(self) -> bool {
        self == Self::Block
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified difference between artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftFinding {
    /// Affected field.
    pub field_id: String,
    /// Finding kind.
    pub kind: FindingKind,
    /// Severity after applying the field's break policy.
    pub severity: Severity,
    /// Attribute that differs, e.g. `source_system` or `source.as_of`.
    pub attribute: String,
    /// Baseline value (empty when absent).
    pub before: String,
    /// Current value (empty when absent).
    pub after: String,
    /// Human-readable summary.
    pub message: String,
}

impl DriftFinding {
    /// Total order: severity descending, then field, kind, attribute, values.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.field_id.cmp(&other.field_id))
            .then_with(|| self.kind.as_str().cmp(other.kind.as_str()))
            .then_with(|| self.attribute.cmp(&other.attribute))
            .then_with(|| self.before.cmp(&other.before))
            .then_with(|| self.after.cmp(&other.after))
            .then_with(|| self.message.cmp(&other.message))
    }
}

/// Finding counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    /// All findings.
    pub total: usize,
    /// Breaking findings.
    pub block: usize,
    /// Advisory findings.
    pub warn: usize,
    /// Informational findings.
    pub info: usize,
}

/// Ordered drift findings plus counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Counts by severity.
    pub summary: DriftSummary,
    /// Findings in sort order.
    pub findings: Vec<DriftFinding>,
}

impl DriftReport {
    /// Sorts findings and computes the summary.
    #[must_use]
    pub fn from_findings(mut findings: Vec<DriftFinding>) -> Self {
        findings.sort_by(DriftFinding::sort_cmp);
        let mut summary = DriftSummary { total: findings.len(), ..DriftSummary::default() };
        for finding in &findings {
            match finding.severity {
                Severity::Block => summary.block += 1,
                Severity::Warn => summary.warn += 1,
                Severity::Info => summary.info += 1,
            }
        }
        Self { summary, findings }
    }

    /// Returns `true` if no findings were produced.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Formats a drift report as a human-readable string.
#[must_use]
pub fn format_drift_report(report: &DriftReport) -> String {
    if report.is_clean() {
        return "No lineage drift detected.".to_string();
    }

    let mut lines = Vec::new();
    for finding in &report.findings {
        lines.push(format!(
            "[{}] {} {} ({}): {}",
            finding.severity.as_str().to_ascii_uppercase(),
            finding.field_id,
            finding.kind,
            finding.attribute,
            finding.message
        ));
    }
    lines.push(String::new());
    let s = &report.summary;
    lines.push(format!(
        "{} finding{}: {} block, {} warn, {} info",
        s.total,
        if s.total == 1 { "" } else { "s" },
        s.block,
        s.warn,
        s.info
    ));
    lines.join("\n")
}
