//! Process-level settings resolved from the environment.
//!
//! `.env` is loaded by the binary before this runs, so values there behave
//! exactly like exported variables.

use std::env;

/// Variable holding the `tracing` filter directive.
pub const LOG_ENV: &str = "LINEAGE_LOG";

/// Filter used when [`LOG_ENV`] is unset or blank.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings that apply to the whole invocation rather than one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `EnvFilter` directive for the stderr subscriber.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self { log_filter: DEFAULT_LOG_FILTER.to_string() }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_filter = lookup(LOG_ENV)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Self { log_filter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_warn() {
        assert_eq!(Settings::from_lookup(|_| None), Settings::default());
        assert_eq!(Settings::from_lookup(|_| Some("  ".into())).log_filter, "warn");
    }

    #[test]
    fn reads_log_filter() {
        let settings = Settings::from_lookup(|key| {
            (key == LOG_ENV).then(|| "lineage_gate=debug".to_string())
        });
        assert_eq!(settings.log_filter, "lineage_gate=debug");
    }
}
