//! Time-bounded drift exceptions.
//!
//! Overrides come from `lineage:override` directives embedded in source and
//! from an optional YAML file:
//!
//! ```yaml
//! overrides:
//!   - id: user_id
//!     kind: changed
//!     reason: planned identity migration
//!     owner: team.payments
//!     expires_at: 2026-06-30
//!     ticket: PAY-12
//! ```

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ServiceContext;
use crate::drift::{DriftFinding, FindingKind};
use crate::error::LineageError;

/// Kind wildcard matching every finding kind.
pub const ANY_KIND: &str = "*";

/// An audited exception for one field's drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    /// Field id the override applies to.
    #[serde(alias = "field_id", alias = "field_or_rule_id")]
    pub id: String,
    /// Finding kind, or `*` for all kinds.
    #[serde(default = "any_kind")]
    pub kind: String,
    /// Why the drift is accepted.
    pub reason: String,
    /// Who accepted it.
    #[serde(default)]
    pub owner: String,
    /// `YYYY-MM-DD` (valid through that UTC day) or an RFC 3339 instant.
    #[serde(alias = "expires")]
    pub expires_at: String,
    /// Tracking ticket.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ticket: String,
    /// Source file for directive overrides.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    /// Source line for directive overrides.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub line: usize,
}

/// Returns `true` for `*` or the wire name of a finding kind.
#[must_use]
pub fn is_known_kind(kind: &str) -> bool {
    kind == ANY_KIND || FindingKind::ALL.iter().any(|k| k.as_str() == kind)
}

fn any_kind() -> String {
    ANY_KIND.to_string()
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Override {
    /// Returns `true` while `now` is before the expiry. Unparsable expiries
    /// are never active.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        parse_expiry(&self.expires_at).is_some_and(|expiry| now < expiry)
    }

    /// Returns `true` if this override names the finding's field and kind.
    #[must_use]
    pub fn matches(&self, finding: &DriftFinding) -> bool {
        self.id == finding.field_id && (self.kind == ANY_KIND || self.kind == finding.kind.as_str())
    }
}

/// Parses an expiry into the first instant at which it no longer holds.
///
/// A bare date expires at the following midnight UTC.
#[must_use]
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(date.succ_opt()?.and_hms_opt(0, 0, 0)?.and_utc())
}

#[derive(Debug, Deserialize)]
struct OverridesFile {
    #[serde(default)]
    overrides: Vec<Override>,
}

/// Loads and validates a YAML overrides file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, or if an entry
/// has an empty id or reason, an unknown kind, or an unparsable expiry.
pub fn load_overrides(ctx: &ServiceContext, path: &Path) -> Result<Vec<Override>, LineageError> {
    let invalid = |message: String| LineageError::Overrides { path: path.to_path_buf(), message };

    let bytes = ctx.fs.read(path).map_err(|e| LineageError::io(path, e))?;
    let file: OverridesFile =
        serde_yaml::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

    for (idx, entry) in file.overrides.iter().enumerate() {
        if entry.id.trim().is_empty() {
            return Err(invalid(format!("overrides[{idx}]: id cannot be empty")));
        }
        if entry.reason.trim().is_empty() {
            return Err(invalid(format!("overrides[{idx}] ({}): reason cannot be empty", entry.id)));
        }
        if !is_known_kind(&entry.kind) {
            return Err(invalid(format!(
                "overrides[{idx}] ({}): unknown kind {:?}, expected '*', added, removed, changed or stale-source",
                entry.id, entry.kind
            )));
        }
        if parse_expiry(&entry.expires_at).is_none() {
            return Err(invalid(format!(
                "overrides[{idx}] ({}): expires_at {:?} is not YYYY-MM-DD or RFC 3339",
                entry.id, entry.expires_at
            )));
        }
    }

    tracing::debug!(path = %path.display(), count = file.overrides.len(), "loaded overrides");
    Ok(file.overrides)
}
