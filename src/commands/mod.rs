//! Command dispatch and handlers.

pub mod diff;
pub mod escalate;
pub mod export;

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::error::LineageError;
use crate::Outcome;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error if the selected command handler fails.
pub fn dispatch(command: &Command, ctx: &ServiceContext) -> Result<Outcome, LineageError> {
    match command {
        Command::Export { out, paths, workers } => export::run(ctx, out, paths, *workers),
        Command::Diff { base, head, mode, overrides, format } => {
            let args = diff::DiffArgs {
                base: base.as_path(),
                head: head.as_path(),
                mode: *mode,
                overrides: overrides.as_deref(),
                format: *format,
            };
            diff::run(ctx, &args)
        }
        Command::Escalate { service, artifact, systems, max_depth, format } => {
            escalate::run(ctx, service, artifact, systems, *max_depth, *format)
        }
    }
}

/// Serializes a value as pretty JSON for stdout.
fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, LineageError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LineageError::Usage(format!("cannot encode output: {e}")))
}
