//! Parser for lineage annotations embedded in source comments.
//!
//! Field directive:
//!
//! ```text
//! // lineage:source field_id=user_id source_system=payments sources=api:identity.GetUser#response.id@cross_repo
//! ```
//!
//! Source reference grammar:
//!
//! ```text
//! kind:target#path[@scope[!as_of]][?contract_ref=<ref>[&provider_id=<id>][&upstream_system=<id>]]
//! ```
//!
//! Override directive:
//!
//! ```text
//! # lineage:override field_id=user_id kind=changed expires=2026-06-30 reason="migration" owner=team.pay
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::{BreakPolicy, Field, ParseError, Scope, SourceRef};
use crate::policy::{is_known_kind, parse_expiry, Override, ANY_KIND};

static KV_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-z_]+)=("(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|\S+)"#).expect("kv pattern")
});
static FIELD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{2,63}$").expect("field id pattern"));
static SOURCE_SYSTEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]{0,63}(:[A-Za-z0-9_-]{1,63})?$").expect("system pattern")
});
static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("version pattern"));
static OWNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_.-]{2,63}$").expect("owner pattern"));
static ESCALATION_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+:\S+$").expect("escalation pattern"));
static PROVIDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{1,63}$").expect("provider pattern"));
const FIELD_DIRECTIVES: &[&str] = &["lineage:source", "lineage-source"];
const OVERRIDE_DIRECTIVES: &[&str] = &["lineage:override", "lineage-override"];

const FIELD_KEYS: &[&str] = &[
    "field_id",
    "renamed_from",
    "field",
    "source_system",
    "source_version",
    "min_supported_source_version",
    "sources",
    "owner",
    "escalation",
    "transform",
    "merge",
    "break_policy",
    "confidence",
    "data_classification",
    "note",
];
const OVERRIDE_KEYS: &[&str] = &["field_id", "kind", "expires", "reason", "owner", "ticket"];

const SOURCE_KINDS: &[&str] = &["api", "event", "db", "file", "cache", "input"];
const TRANSFORMS: &[&str] = &["passthrough", "normalize", "derive", "aggregate", "mask", "join"];
const MERGES: &[&str] = &["single_source", "priority", "first_non_null", "union", "custom"];
const CONFIDENCES: &[&str] = &["declared", "inferred"];
const CLASSIFICATIONS: &[&str] = &["public", "internal", "sensitive", "regulated"];

/// Everything extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
    /// Valid field annotations in line order.
    pub fields: Vec<Field>,
    /// Valid override directives in line order.
    pub overrides: Vec<Override>,
    /// Malformed directives.
    pub errors: Vec<ParseError>,
}

/// Extracts lineage annotations and overrides from source text.
///
/// Malformed directives become [`ParseError`]s; they never stop the scan.
/// File paths are left empty for the caller to fill in.
#[must_use]
pub fn parse_source(source: &str) -> ParsedSource {
    let mut parsed = ParsedSource::default();

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        let Some(comment) = comment_text(raw_line) else {
            continue;
        };

        if let Some(payload) = directive_payload(comment, FIELD_DIRECTIVES) {
            match parse_field(payload) {
                Ok(mut field) => {
                    field.line = line;
                    parsed.fields.push(field);
                }
                Err(message) => parsed.errors.push(parse_error(line, message)),
            }
        } else if let Some(payload) = directive_payload(comment, OVERRIDE_DIRECTIVES) {
            match parse_override(payload) {
                Ok(mut ov) => {
                    ov.line = line;
                    parsed.overrides.push(ov);
                }
                Err(message) => parsed.errors.push(parse_error(line, message)),
            }
        }
    }

    parsed
}

fn parse_error(line: usize, message: String) -> ParseError {
    ParseError { file_path: String::new(), line, message }
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("/*") {
        return rest.strip_suffix("*/").map(str::trim);
    }
    trimmed.strip_prefix('#').or_else(|| trimmed.strip_prefix('*')).map(str::trim)
}

fn directive_payload<'a>(comment: &'a str, names: &[&str]) -> Option<&'a str> {
    names.iter().find_map(|name| {
        let rest = comment.strip_prefix(name)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            Some(rest.trim())
        } else {
            None
        }
    })
}

fn key_values(payload: &str, allowed: &[&str]) -> Result<BTreeMap<String, String>, String> {
    let mut values = BTreeMap::new();
    for caps in KV_PAIR.captures_iter(payload) {
        let key = caps[1].to_string();
        if !allowed.contains(&key.as_str()) {
            return Err(format!("unknown key {key:?}"));
        }
        let value = unquote(caps[2].trim()).to_string();
        if values.insert(key.clone(), value).is_some() {
            return Err(format!("duplicate key {key:?}"));
        }
    }
    Ok(values)
}

fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn value<'a>(values: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    values.get(key).map_or("", |v| v.trim())
}

fn require<'a>(values: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str, String> {
    let v = value(values, key);
    if v.is_empty() {
        Err(format!("missing required key {key:?}"))
    } else {
        Ok(v)
    }
}

fn optional_enum<'a>(
    values: &'a BTreeMap<String, String>,
    key: &str,
    allowed: &[&str],
) -> Result<&'a str, String> {
    let v = value(values, key);
    if v.is_empty() || allowed.contains(&v) {
        Ok(v)
    } else {
        Err(format!("{key} must be one of {}", allowed.join("|")))
    }
}

fn optional_match<'a>(
    values: &'a BTreeMap<String, String>,
    key: &str,
    pattern: &Regex,
    hint: &str,
) -> Result<&'a str, String> {
    let v = value(values, key);
    if v.is_empty() || pattern.is_match(v) {
        Ok(v)
    } else {
        Err(format!("{key} {hint}"))
    }
}

fn parse_field(payload: &str) -> Result<Field, String> {
    let kv = key_values(payload, FIELD_KEYS)?;

    let field_id = require(&kv, "field_id")?;
    if !FIELD_ID.is_match(field_id) {
        return Err("field_id must match [a-z][a-z0-9_]{2,63}".to_string());
    }
    let renamed_from = value(&kv, "renamed_from");
    if !renamed_from.is_empty() {
        if !FIELD_ID.is_match(renamed_from) {
            return Err("renamed_from must match [a-z][a-z0-9_]{2,63}".to_string());
        }
        if renamed_from == field_id {
            return Err("renamed_from cannot equal field_id".to_string());
        }
    }
    let source_system = require(&kv, "source_system")?;
    if !SOURCE_SYSTEM.is_match(source_system) {
        return Err("source_system must match [A-Za-z][A-Za-z0-9_-]{0,63} with an optional :qualifier"
            .to_string());
    }
    let sources = parse_sources(require(&kv, "sources")?)?;

    let source_version =
        optional_match(&kv, "source_version", &VERSION, "must use [A-Za-z0-9._-]")?;
    let min_supported = optional_match(
        &kv,
        "min_supported_source_version",
        &VERSION,
        "must use [A-Za-z0-9._-]",
    )?;
    let owner =
        optional_match(&kv, "owner", &OWNER, "must be a normalized team id like team.identity")?;
    let escalation = optional_match(
        &kv,
        "escalation",
        &ESCALATION_REF,
        "must be a typed ref like slack:#channel or pagerduty:service",
    )?;
    let transform = optional_enum(&kv, "transform", TRANSFORMS)?;
    let merge = optional_enum(&kv, "merge", MERGES)?;
    let confidence = optional_enum(&kv, "confidence", CONFIDENCES)?;
    let classification = optional_enum(&kv, "data_classification", CLASSIFICATIONS)?;

    let break_policy = match value(&kv, "break_policy") {
        "" => None,
        raw => Some(
            BreakPolicy::parse(raw).ok_or("break_policy must be one of block|warn|allow")?,
        ),
    };

    if merge == "single_source" && sources.len() > 1 {
        return Err("merge=single_source is invalid when multiple sources are declared".to_string());
    }

    Ok(Field {
        field_id: field_id.to_string(),
        renamed_from: renamed_from.to_string(),
        field: value(&kv, "field").to_string(),
        source_system: source_system.to_string(),
        source_version: source_version.to_string(),
        min_supported_source_version: min_supported.to_string(),
        sources,
        owner: owner.to_string(),
        escalation: escalation.to_string(),
        transform: transform.to_string(),
        merge: merge.to_string(),
        break_policy,
        confidence: confidence.to_string(),
        data_classification: classification.to_string(),
        note: value(&kv, "note").to_string(),
        file_path: String::new(),
        line: 0,
    })
}

fn parse_sources(raw: &str) -> Result<Vec<SourceRef>, String> {
    let sources = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_source_ref)
        .collect::<Result<Vec<_>, _>>()?;
    if sources.is_empty() {
        return Err("sources must contain at least one source reference".to_string());
    }
    Ok(sources)
}

/// Parses one `kind:target#path@scope!as_of?query` reference.
fn parse_source_ref(raw: &str) -> Result<SourceRef, String> {
    let (core, query) = raw.split_once('?').unwrap_or((raw, ""));

    let Some((kind, rest)) = core.split_once(':') else {
        return Err(format!("invalid source reference {raw:?} (expected kind:target#path)"));
    };
    let kind = kind.trim().to_ascii_lowercase();
    if !SOURCE_KINDS.contains(&kind.as_str()) {
        return Err(format!("unsupported source kind {kind:?}"));
    }

    let Some((target, path_and_meta)) = rest.split_once('#') else {
        return Err(format!("invalid source reference {raw:?} (missing #path)"));
    };
    let target = target.trim();
    let path_and_meta = path_and_meta.trim();
    if target.is_empty() || path_and_meta.is_empty() {
        return Err(format!("invalid source reference {raw:?} (target/path cannot be empty)"));
    }

    let (path, scope_raw, as_of) = match path_and_meta.rsplit_once('@') {
        None => (path_and_meta, "internal", ""),
        Some((path, meta)) => {
            let meta = meta.trim();
            if meta.is_empty() {
                return Err(format!("invalid source reference {raw:?} (missing scope after @)"));
            }
            let (scope, as_of) = meta.split_once('!').unwrap_or((meta, ""));
            (path.trim(), scope.trim(), as_of.trim())
        }
    };

    let scope = match scope_raw {
        "internal" => Scope::Internal,
        "cross_repo" => Scope::CrossRepo,
        "external" => Scope::External,
        other => {
            return Err(format!(
                "unsupported source scope {other:?} (use internal|cross_repo|external)"
            ))
        }
    };

    if scope == Scope::External {
        if !valid_date(as_of) {
            return Err(format!("external source {raw:?} must include as_of date YYYY-MM-DD"));
        }
    } else if !as_of.is_empty() {
        return Err(format!("source {raw:?} includes as_of date but scope is {scope_raw:?}"));
    }

    let mut params = BTreeMap::new();
    for (key, val) in url::form_urlencoded::parse(query.as_bytes()) {
        let (key, val) = (key.trim().to_string(), val.trim().to_string());
        if key.is_empty() || val.is_empty() {
            return Err(format!("invalid source reference {raw:?} (empty query key or value)"));
        }
        if !["contract_ref", "provider_id", "upstream_system"].contains(&key.as_str()) {
            return Err(format!("source {raw:?} has unsupported query key {key:?}"));
        }
        params.insert(key, val);
    }
    let take = |key: &str| params.get(key).cloned().unwrap_or_default();
    let provider_id = take("provider_id");
    let upstream_system = take("upstream_system");

    if !provider_id.is_empty() {
        if scope != Scope::External {
            return Err(format!("source {raw:?} includes provider_id but scope is {scope_raw:?}"));
        }
        if !PROVIDER_ID.is_match(&provider_id) {
            return Err(format!("external source {raw:?} has invalid provider_id"));
        }
    }
    if !upstream_system.is_empty() && !SOURCE_SYSTEM.is_match(&upstream_system) {
        return Err(format!("source {raw:?} has invalid upstream_system"));
    }

    Ok(SourceRef {
        kind,
        target: target.to_string(),
        path: path.to_string(),
        scope,
        provider_id,
        upstream_system,
        contract_ref: take("contract_ref"),
        as_of: as_of.to_string(),
    })
}

fn parse_override(payload: &str) -> Result<Override, String> {
    let kv = key_values(payload, OVERRIDE_KEYS)
        .map_err(|message| format!("lineage override: {message}"))?;

    let field_id =
        require(&kv, "field_id").map_err(|message| format!("lineage override {message}"))?;
    if !FIELD_ID.is_match(field_id) {
        return Err("lineage override field_id must match [a-z][a-z0-9_]{2,63}".to_string());
    }
    let kind = match value(&kv, "kind") {
        "" => ANY_KIND,
        kind if is_known_kind(kind) => kind,
        _ => return Err("lineage override kind must be '*' or a finding kind".to_string()),
    };
    let expires =
        require(&kv, "expires").map_err(|message| format!("lineage override {message}"))?;
    if parse_expiry(expires).is_none() {
        return Err("lineage override expires must use YYYY-MM-DD or RFC 3339".to_string());
    }
    let reason =
        require(&kv, "reason").map_err(|message| format!("lineage override {message}"))?;

    Ok(Override {
        id: field_id.to_string(),
        kind: kind.to_string(),
        reason: reason.to_string(),
        owner: value(&kv, "owner").to_string(),
        expires_at: expires.to_string(),
        ticket: value(&kv, "ticket").to_string(),
        file_path: String::new(),
        line: 0,
    })
}

fn valid_date(raw: &str) -> bool {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}
