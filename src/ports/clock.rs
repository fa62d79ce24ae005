//! Clock port for override expiry evaluation.

use chrono::{DateTime, Utc};

/// Provides the evaluation time for the policy gate.
///
/// Overrides are judged against this instant, so tests pin it to make
/// expiry behavior reproducible.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> DateTime<Utc>;
}
