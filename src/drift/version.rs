//! Ordering for producer version strings such as `v2026.02` or `1.4.0-rc1`.

use std::cmp::Ordering;

/// Compares two version strings component by component.
///
/// A leading `v` is ignored. Components split on `.`, `-`, and `_`; two
/// numeric components compare numerically, anything else lexically. A
/// missing component counts as `0`, so `1.2` equals `1.2.0`.
#[must_use]
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let left = components(left);
    let right = components(right);
    let len = left.len().max(right.len());
    for idx in 0..len {
        let a = left.get(idx).copied().unwrap_or("0");
        let b = right.get(idx).copied().unwrap_or("0");
        let ord = match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => a.cmp(b),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn components(raw: &str) -> Vec<&str> {
    let raw = raw.trim();
    let raw = raw.strip_prefix(['v', 'V']).unwrap_or(raw);
    raw.split(['.', '-', '_']).filter(|part| !part.is_empty()).collect()
}
