//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::policy::Mode;

/// Top-level CLI parser for `lineage`.
#[derive(Debug, Parser)]
#[command(name = "lineage", version, about = "Collect field lineage, gate drift, route escalations")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty JSON.
    Json,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan source trees and write a lineage artifact.
    Export {
        /// Artifact output path.
        #[arg(long)]
        out: PathBuf,
        /// Roots to scan (defaults to the current directory).
        paths: Vec<PathBuf>,
        /// Parser threads (defaults to one per core).
        #[arg(long, env = "LINEAGE_WORKERS")]
        workers: Option<usize>,
    },
    /// Compare two artifacts and gate the drift.
    Diff {
        /// Baseline artifact.
        #[arg(long)]
        base: PathBuf,
        /// Current artifact.
        #[arg(long)]
        head: PathBuf,
        /// Gate mode.
        #[arg(long, value_enum, env = "LINEAGE_MODE", default_value_t = Mode::Block)]
        mode: Mode,
        /// YAML file of additional overrides.
        #[arg(long, env = "LINEAGE_OVERRIDES")]
        overrides: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Resolve who to contact about bad data reported by a service.
    Escalate {
        /// Reporting service id.
        #[arg(long)]
        service: String,
        /// Artifact describing field lineage.
        #[arg(long)]
        artifact: PathBuf,
        /// System registry YAML.
        #[arg(long)]
        systems: PathBuf,
        /// Maximum upstream hops (0 uses the default of 8).
        #[arg(long, env = "LINEAGE_MAX_DEPTH", default_value_t = 0)]
        max_depth: usize,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
