//! `lineage escalate` command.

use std::path::Path;

use super::to_pretty_json;
use crate::artifact::load_artifact;
use crate::cli::OutputFormat;
use crate::context::ServiceContext;
use crate::error::LineageError;
use crate::escalation::{build_escalation_chain, format_escalation_chain, load_system_registry};
use crate::Outcome;

/// Prints the escalation chain for `service`.
///
/// The registry is validated before any traversal.
///
/// # Errors
///
/// Returns an error for an unreadable or invalid registry or artifact, an
/// empty service id, or an unresolvable chain.
pub fn run(
    ctx: &ServiceContext,
    service: &str,
    artifact: &Path,
    systems: &Path,
    max_depth: usize,
    format: OutputFormat,
) -> Result<Outcome, LineageError> {
    let registry = load_system_registry(ctx, systems)?;
    let artifact = load_artifact(ctx, artifact)?;
    let steps = build_escalation_chain(service, &artifact, &registry, max_depth)?;

    let rendered = match format {
        OutputFormat::Text => format_escalation_chain(service, &steps),
        OutputFormat::Json => to_pretty_json(&steps)?,
    };
    println!("{rendered}");
    Ok(Outcome::Pass)
}
