//! Core library entry for the `lineage` CLI.
//!
//! Collects field-level provenance annotations into an artifact, classifies
//! drift between two artifacts behind a warn/block gate, and walks the
//! upstream system graph to build an escalation chain.

pub mod adapters;
pub mod artifact;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod drift;
pub mod error;
pub mod escalation;
pub mod policy;
pub mod ports;

use clap::Parser;

use crate::context::ServiceContext;
use crate::error::LineageError;

/// Result of a successful command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing blocking.
    Pass,
    /// Block-mode gate failed on breaking drift.
    Blocked,
}

impl Outcome {
    /// Process exit code: `0` for pass, `1` for blocked.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Pass => 0,
            Self::Blocked => 1,
        }
    }
}

/// Run the CLI with the provided arguments against a live context.
///
/// `--help` and `--version` print and pass.
///
/// # Errors
///
/// Returns an error when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<Outcome, LineageError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    run_with_context(args, &ServiceContext::live())
}

/// Run the CLI with an explicit context.
///
/// # Errors
///
/// Returns an error when argument parsing fails or command execution fails.
pub fn run_with_context<I, T>(args: I, ctx: &ServiceContext) -> Result<Outcome, LineageError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            print!("{err}");
            return Ok(Outcome::Pass);
        }
        Err(err) => return Err(LineageError::Usage(err.to_string())),
    };
    commands::dispatch(&cli.command, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fixture::{FixedClock, MemoryFileSystem};

    fn fixture() -> ServiceContext {
        let fs = MemoryFileSystem::new()
            .with_file(
                "svc/user.go",
                "// lineage:source field_id=user_id source_system=payments sources=api:identity.GetUser#id\n",
            )
            .with_file("empty.json", "{\"fields\":[]}");
        ServiceContext::fixture(fs, FixedClock::at_date("2026-01-01"))
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Pass.exit_code(), 0);
        assert_eq!(Outcome::Blocked.exit_code(), 1);
    }

    #[test]
    fn export_then_diff_against_empty_baseline() {
        let ctx = fixture();
        let exported = run_with_context(["lineage", "export", "--out", "head.json", "svc"], &ctx);
        assert_eq!(exported.unwrap(), Outcome::Pass);

        let diffed = run_with_context(
            ["lineage", "diff", "--base", "head.json", "--head", "empty.json", "--mode", "block"],
            &ctx,
        );
        assert_eq!(diffed.unwrap(), Outcome::Blocked);
    }

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run_with_context(["lineage", "unknown"], &fixture());
        assert!(matches!(result, Err(LineageError::Usage(_))));
    }

    #[test]
    fn help_passes() {
        assert_eq!(run_with_context(["lineage", "--help"], &fixture()).unwrap(), Outcome::Pass);
    }
}
