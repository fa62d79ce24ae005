//! Pairwise field comparison.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::{compare_versions, DriftFinding, DriftReport, FindingKind, Severity};
use crate::artifact::{Artifact, BreakPolicy, Field, SourceRef};

/// Classifies drift from `baseline` to `current`.
///
/// - A field only in `current` is `added`: informational unless its own
///   break policy says `warn` or `block`.
/// - A field only in `baseline` is `removed`: breaking unless the baseline
///   field's policy downgrades it (`warn` to advisory, `allow` to info).
/// - A current field whose `renamed_from` names a baseline field that is
///   otherwise gone is paired with it: one advisory `changed`/`field_id`
///   finding, then the usual attribute comparison, instead of a removal plus
///   an addition. When several fields claim the same old id, the lowest new
///   id wins and the rest are additions.
/// - A field in both yields one `changed` finding per differing structural
///   attribute, graded by the current field's policy (none means `block`).
///   Ownership and note edits are always informational.
/// - Independently, a current `source_version` below the baseline's
///   `min_supported_source_version` yields `stale-source`.
#[must_use]
pub fn diff_artifacts(baseline: &Artifact, current: &Artifact) -> DriftReport {
    let base = baseline.by_id();
    let head = current.by_id();
    let renames = pair_renames(&base, &head);
    let mut findings = Vec::new();

    for (id, before) in &base {
        if let Some(after) = head.get(id) {
            compare_field(before, after, &mut findings);
            check_stale_source(before, after, &mut findings);
        } else if let Some(after) = renames.get(id) {
            findings.push(DriftFinding {
                field_id: after.field_id.clone(),
                kind: FindingKind::Changed,
                severity: Severity::Warn,
                attribute: "field_id".to_string(),
                before: (*id).to_string(),
                after: after.field_id.clone(),
                message: format!("field_id renamed from {id} to {}", after.field_id),
            });
            compare_field(before, after, &mut findings);
            check_stale_source(before, after, &mut findings);
        } else {
            findings.push(DriftFinding {
                field_id: (*id).to_string(),
                kind: FindingKind::Removed,
                severity: Severity::for_policy(before.break_policy),
                attribute: "field".to_string(),
                before: before.source_system.clone(),
                after: String::new(),
                message: format!(
                    "field {id} produced by {} was removed from the artifact",
                    before.source_system
                ),
            });
        }
    }

    let renamed: BTreeSet<&str> = renames.values().map(|f| f.field_id.as_str()).collect();
    for (id, after) in &head {
        if base.contains_key(id) || renamed.contains(id) {
            continue;
        }
        let severity = match after.break_policy {
            Some(BreakPolicy::Block) => Severity::Block,
            Some(BreakPolicy::Warn) => Severity::Warn,
            Some(BreakPolicy::Allow) | None => Severity::Info,
        };
        findings.push(DriftFinding {
            field_id: (*id).to_string(),
            kind: FindingKind::Added,
            severity,
            attribute: "field".to_string(),
            before: String::new(),
            after: after.source_system.clone(),
            message: format!("field {id} produced by {} was added", after.source_system),
        });
    }

    let report = DriftReport::from_findings(findings);
    tracing::info!(
        total = report.summary.total,
        block = report.summary.block,
        warn = report.summary.warn,
        info = report.summary.info,
        "lineage drift classified"
    );
    report
}

/// Maps each vanished baseline id to the new current field that declares it
/// as `renamed_from`. Both sides must be unmatched by exact id.
fn pair_renames<'a>(
    base: &BTreeMap<&'a str, &'a Field>,
    head: &BTreeMap<&'a str, &'a Field>,
) -> BTreeMap<&'a str, &'a Field> {
    let mut renames = BTreeMap::new();
    for (id, after) in head {
        let from = after.renamed_from.trim();
        if from.is_empty() || base.contains_key(id) || head.contains_key(from) {
            continue;
        }
        if let Some((old_id, _)) = base.get_key_value(from) {
            renames.entry(*old_id).or_insert(*after);
        }
    }
    renames
}

fn policy_label(policy: Option<BreakPolicy>) -> String {
    policy.map_or_else(|| "unset".to_string(), |p| p.as_str().to_string())
}

fn compare_field(before: &Field, after: &Field, findings: &mut Vec<DriftFinding>) {
    let severity = Severity::for_policy(after.break_policy);
    let mut changed = |attribute: &str, old: &str, new: &str, severity: Severity| {
        if old != new {
            findings.push(DriftFinding {
                field_id: after.field_id.clone(),
                kind: FindingKind::Changed,
                severity,
                attribute: attribute.to_string(),
                before: old.to_string(),
                after: new.to_string(),
                message: format!(
                    "{attribute} changed from {} to {}",
                    display(old),
                    display(new)
                ),
            });
        }
    };

    changed("field", &before.field, &after.field, severity);
    changed("source_system", &before.source_system, &after.source_system, severity);
    changed("source_version", &before.source_version, &after.source_version, severity);
    changed(
        "min_supported_source_version",
        &before.min_supported_source_version,
        &after.min_supported_source_version,
        severity,
    );
    changed("transform", &before.transform, &after.transform, severity);
    changed("merge", &before.merge, &after.merge, severity);
    changed(
        "data_classification",
        &before.data_classification,
        &after.data_classification,
        severity,
    );
    changed(
        "break_policy",
        &policy_label(before.break_policy),
        &policy_label(after.break_policy),
        severity,
    );

    changed("owner", &before.owner, &after.owner, Severity::Info);
    changed("escalation", &before.escalation, &after.escalation, Severity::Info);
    changed("confidence", &before.confidence, &after.confidence, Severity::Info);
    changed("note", &before.note, &after.note, Severity::Info);

    compare_sources(after, &before.sources, &after.sources, severity, findings);
}

fn compare_sources(
    field: &Field,
    before: &[SourceRef],
    after: &[SourceRef],
    severity: Severity,
    findings: &mut Vec<DriftFinding>,
) {
    let base: BTreeMap<String, &SourceRef> = before.iter().map(|s| (s.identity(), s)).collect();
    let head: BTreeMap<String, &SourceRef> = after.iter().map(|s| (s.identity(), s)).collect();

    let mut push = |attribute: &str, old: String, new: String, message: String| {
        findings.push(DriftFinding {
            field_id: field.field_id.clone(),
            kind: FindingKind::Changed,
            severity,
            attribute: attribute.to_string(),
            before: old,
            after: new,
            message,
        });
    };

    for (identity, old) in &base {
        let Some(new) = head.get(identity) else {
            push(
                "sources",
                identity.clone(),
                String::new(),
                format!("source {} no longer feeds {}", old.target, field.field_id),
            );
            continue;
        };
        for (attribute, a, b) in [
            ("source.as_of", &old.as_of, &new.as_of),
            ("source.contract_ref", &old.contract_ref, &new.contract_ref),
            ("source.upstream_system", &old.upstream_system, &new.upstream_system),
            ("source.provider_id", &old.provider_id, &new.provider_id),
        ] {
            if a == b {
                continue;
            }
            let mut message = format!(
                "{attribute} of {} changed from {} to {}",
                old.target,
                display(a),
                display(b)
            );
            if attribute == "source.as_of" && compare_versions(b, a) == Ordering::Less {
                message.push_str(" (snapshot rolled back)");
            }
            push(attribute, a.clone(), b.clone(), message);
        }
    }

    for (identity, new) in &head {
        if !base.contains_key(identity) {
            push(
                "sources",
                String::new(),
                identity.clone(),
                format!("source {} now feeds {}", new.target, field.field_id),
            );
        }
    }
}

fn check_stale_source(before: &Field, after: &Field, findings: &mut Vec<DriftFinding>) {
    let floor = before.min_supported_source_version.trim();
    let current = after.source_version.trim();
    if floor.is_empty() || current.is_empty() {
        return;
    }
    if compare_versions(current, floor) == Ordering::Less {
        findings.push(DriftFinding {
            field_id: after.field_id.clone(),
            kind: FindingKind::StaleSource,
            severity: Severity::for_policy(after.break_policy),
            attribute: "source_version".to_string(),
            before: floor.to_string(),
            after: current.to_string(),
            message: format!(
                "source_version {current} is below the supported minimum {floor}"
            ),
        });
    }
}

fn display(value: &str) -> &str {
    if value.is_empty() {
        "(none)"
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Scope;

    fn field(id: &str, system: &str, policy: Option<BreakPolicy>) -> Field {
        Field {
            field_id: id.into(),
            source_system: system.into(),
            source_version: "v2".into(),
            min_supported_source_version: "v1".into(),
            sources: vec![SourceRef {
                kind: "api".into(),
                target: "identity.GetUser".into(),
                path: "id".into(),
                scope: Scope::CrossRepo,
                ..SourceRef::default()
            }],
            break_policy: policy,
            ..Field::default()
        }
    }

    fn kinds(report: &DriftReport) -> Vec<(&str, FindingKind, Severity)> {
        report.findings.iter().map(|f| (f.field_id.as_str(), f.kind, f.severity)).collect()
    }

    #[test]
    fn identical_artifacts_are_clean() {
        let a = Artifact::new(vec![field("user_id", "payments", None)]);
        assert!(diff_artifacts(&a, &a.clone()).is_clean());
    }

    #[test]
    fn removed_field_severity_matrix() {
        let cases = [
            (None, Severity::Block),
            (Some(BreakPolicy::Block), Severity::Block),
            (Some(BreakPolicy::Warn), Severity::Warn),
            (Some(BreakPolicy::Allow), Severity::Info),
        ];
        for (policy, expected) in cases {
            let base = Artifact::new(vec![field("x_field", "payments", policy)]);
            let report = diff_artifacts(&base, &Artifact::default());
            assert_eq!(
                kinds(&report),
                vec![("x_field", FindingKind::Removed, expected)],
                "policy {policy:?}"
            );
        }
    }

    #[test]
    fn added_field_severity_matrix() {
        let cases = [
            (None, Severity::Info),
            (Some(BreakPolicy::Allow), Severity::Info),
            (Some(BreakPolicy::Warn), Severity::Warn),
            (Some(BreakPolicy::Block), Severity::Block),
        ];
        for (policy, expected) in cases {
            let head = Artifact::new(vec![field("new_field", "payments", policy)]);
            let report = diff_artifacts(&Artifact::default(), &head);
            assert_eq!(kinds(&report), vec![("new_field", FindingKind::Added, expected)]);
        }
    }

    #[test]
    fn source_system_change_without_policy_is_breaking() {
        let base = Artifact::new(vec![field("user_id", "payments", None)]);
        let head = Artifact::new(vec![field("user_id", "billing", None)]);
        let report = diff_artifacts(&base, &head);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.kind, FindingKind::Changed);
        assert_eq!(finding.severity, Severity::Block);
        assert_eq!(finding.attribute, "source_system");
        assert_eq!((finding.before.as_str(), finding.after.as_str()), ("payments", "billing"));
    }

    #[test]
    fn change_is_graded_by_current_policy() {
        let base = Artifact::new(vec![field("user_id", "payments", Some(BreakPolicy::Block))]);
        let mut changed = field("user_id", "payments", Some(BreakPolicy::Warn));
        changed.transform = "mask".into();
        let report = diff_artifacts(&base, &Artifact::new(vec![changed]));
        let graded: Vec<(&str, Severity)> =
            report.findings.iter().map(|f| (f.attribute.as_str(), f.severity)).collect();
        assert_eq!(graded, vec![("break_policy", Severity::Warn), ("transform", Severity::Warn)]);
    }

    #[test]
    fn metadata_changes_are_informational() {
        let base = Artifact::new(vec![field("user_id", "payments", None)]);
        let mut changed = field("user_id", "payments", None);
        changed.owner = "team.other".into();
        changed.note = "moved".into();
        let report = diff_artifacts(&base, &Artifact::new(vec![changed]));
        assert!(report.findings.iter().all(|f| f.severity == Severity::Info));
        assert_eq!(report.summary.info, 2);
    }

    #[test]
    fn source_set_changes_are_structural() {
        let base = Artifact::new(vec![field("user_id", "payments", Some(BreakPolicy::Warn))]);
        let mut changed = field("user_id", "payments", Some(BreakPolicy::Warn));
        changed.sources[0].target = "accounts.GetUser".into();
        let report = diff_artifacts(&base, &Artifact::new(vec![changed]));
        let attrs: Vec<(&str, bool, bool)> = report
            .findings
            .iter()
            .map(|f| (f.attribute.as_str(), f.before.is_empty(), f.after.is_empty()))
            .collect();
        assert_eq!(attrs, vec![("sources", true, false), ("sources", false, true)]);
    }

    #[test]
    fn external_as_of_rollback_is_flagged() {
        let mut before = field("track", "media", Some(BreakPolicy::Warn));
        before.sources[0].scope = Scope::External;
        before.sources[0].as_of = "2026-02-13".into();
        let mut after = before.clone();
        after.sources[0].as_of = "2025-12-01".into();
        let report = diff_artifacts(&Artifact::new(vec![before]), &Artifact::new(vec![after]));
        assert_eq!(report.findings[0].attribute, "source.as_of");
        assert!(report.findings[0].message.contains("rolled back"));
    }

    #[test]
    fn version_regression_below_floor_is_stale_source() {
        let mut before = field("user_id", "payments", Some(BreakPolicy::Allow));
        before.source_version = "v2026.03".into();
        before.min_supported_source_version = "v2026.02".into();
        let mut after = before.clone();
        after.source_version = "v2026.01".into();

        let report = diff_artifacts(&Artifact::new(vec![before]), &Artifact::new(vec![after]));
        let stale: Vec<&DriftFinding> =
            report.findings.iter().filter(|f| f.kind == FindingKind::StaleSource).collect();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].before, "v2026.02");
        assert_eq!(stale[0].after, "v2026.01");
    }

    #[test]
    fn stale_source_detected_even_without_structural_change() {
        let mut before = field("user_id", "payments", None);
        before.source_version = "1.0".into();
        before.min_supported_source_version = "2.0".into();
        let report = diff_artifacts(&Artifact::new(vec![before.clone()]), &Artifact::new(vec![before]));
        assert_eq!(kinds(&report), vec![("user_id", FindingKind::StaleSource, Severity::Block)]);
    }

    #[test]
    fn declared_rename_pairs_fields_instead_of_remove_and_add() {
        let before = field("user_id", "payments", None);
        let mut after = field("user_primary_id", "payments", None);
        after.renamed_from = "user_id".into();

        let report = diff_artifacts(&Artifact::new(vec![before]), &Artifact::new(vec![after]));
        assert_eq!(kinds(&report), vec![("user_primary_id", FindingKind::Changed, Severity::Warn)]);
        let finding = &report.findings[0];
        assert_eq!(finding.attribute, "field_id");
        assert_eq!((finding.before.as_str(), finding.after.as_str()), ("user_id", "user_primary_id"));
        assert_eq!(report.summary.block, 0);
    }

    #[test]
    fn renamed_field_is_still_compared_and_checked_for_staleness() {
        let mut before = field("user_id", "payments", None);
        before.min_supported_source_version = "v3".into();
        let mut after = field("user_primary_id", "billing", None);
        after.renamed_from = "user_id".into();

        let report = diff_artifacts(&Artifact::new(vec![before]), &Artifact::new(vec![after]));
        let found: Vec<(&str, FindingKind, &str)> = report
            .findings
            .iter()
            .map(|f| (f.field_id.as_str(), f.kind, f.attribute.as_str()))
            .collect();
        assert!(found.contains(&("user_primary_id", FindingKind::Changed, "field_id")));
        assert!(found.contains(&("user_primary_id", FindingKind::Changed, "source_system")));
        assert!(found.contains(&("user_primary_id", FindingKind::Changed, "min_supported_source_version")));
        assert!(found.contains(&("user_primary_id", FindingKind::StaleSource, "source_version")));
        assert!(report.findings.iter().all(|f| f.kind != FindingKind::Removed));
    }

    #[test]
    fn rename_claim_is_ignored_when_old_id_survives_or_is_unknown() {
        let base = Artifact::new(vec![field("user_id", "payments", None)]);
        let mut still_there = field("user_primary_id", "payments", None);
        still_there.renamed_from = "user_id".into();
        let head = Artifact::new(vec![field("user_id", "payments", None), still_there.clone()]);
        assert_eq!(
            kinds(&diff_artifacts(&base, &head)),
            vec![("user_primary_id", FindingKind::Added, Severity::Info)]
        );

        let mut unknown = still_there;
        unknown.renamed_from = "never_existed".into();
        let report = diff_artifacts(&base, &Artifact::new(vec![unknown]));
        let kinds_only: Vec<FindingKind> = report.findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds_only, vec![FindingKind::Removed, FindingKind::Added]);
    }

    #[test]
    fn competing_rename_claims_pair_the_lowest_id() {
        let base = Artifact::new(vec![field("user_id", "payments", None)]);
        let mut first = field("account_id", "payments", None);
        first.renamed_from = "user_id".into();
        let mut second = field("member_id", "payments", None);
        second.renamed_from = "user_id".into();

        let report = diff_artifacts(&base, &Artifact::new(vec![second, first]));
        assert_eq!(
            kinds(&report),
            vec![
                ("account_id", FindingKind::Changed, Severity::Warn),
                ("member_id", FindingKind::Added, Severity::Info),
            ]
        );
    }

    #[test]
    fn repeated_runs_are_identical() {
        let base = Artifact::new(vec![
            field("a_field", "payments", None),
            field("b_field", "payments", Some(BreakPolicy::Warn)),
            field("c_field", "payments", Some(BreakPolicy::Allow)),
        ]);
        let mut c = field("c_field", "billing", Some(BreakPolicy::Allow));
        c.transform = "derive".into();
        let head = Artifact::new(vec![
            c,
            field("d_field", "payments", None),
            field("b_field", "identity", Some(BreakPolicy::Warn)),
        ]);
        let first = serde_json::to_string(&diff_artifacts(&base, &head)).unwrap();
        for _ in 0..5 {
            assert_eq!(serde_json::to_string(&diff_artifacts(&base, &head)).unwrap(), first);
        }
    }
}
