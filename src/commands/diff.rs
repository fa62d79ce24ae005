//! `lineage diff` command.

use std::path::Path;

use serde::Serialize;

use super::to_pretty_json;
use crate::artifact::load_artifact;
use crate::cli::OutputFormat;
use crate::context::ServiceContext;
use crate::drift::{diff_artifacts, DriftSummary};
use crate::error::LineageError;
use crate::policy::{evaluate, format_gate_decision, load_overrides, GateConfig, GateDecision, Mode};
use crate::Outcome;

/// Borrowed arguments of the diff command.
#[derive(Debug, Clone, Copy)]
pub struct DiffArgs<'a> {
    /// Baseline artifact path.
    pub base: &'a Path,
    /// Current artifact path.
    pub head: &'a Path,
    /// Gate mode.
    pub mode: Mode,
    /// Optional overrides YAML.
    pub overrides: Option<&'a Path>,
    /// Output rendering.
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct DiffOutput<'a> {
    summary: DriftSummary,
    #[serde(flatten)]
    decision: &'a GateDecision,
}

/// Classifies drift between two artifacts and applies the gate.
///
/// Overrides declared in the head artifact are combined with those in the
/// overrides file.
///
/// # Errors
///
/// Returns an error if an artifact or the overrides file cannot be loaded.
pub fn run(ctx: &ServiceContext, args: &DiffArgs<'_>) -> Result<Outcome, LineageError> {
    let baseline = load_artifact(ctx, args.base)?;
    let current = load_artifact(ctx, args.head)?;

    let mut overrides = current.overrides.clone();
    if let Some(path) = args.overrides {
        overrides.extend(load_overrides(ctx, path)?);
    }

    let report = diff_artifacts(&baseline, &current);
    let decision =
        evaluate(&report, &GateConfig { mode: args.mode, overrides }, ctx.clock.now());

    let rendered = match args.format {
        OutputFormat::Text => format_gate_decision(&decision),
        OutputFormat::Json => {
            to_pretty_json(&DiffOutput { summary: report.summary, decision: &decision })?
        }
    };
    println!("{rendered}");

    Ok(if decision.passed { Outcome::Pass } else { Outcome::Blocked })
}
