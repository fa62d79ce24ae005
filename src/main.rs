//! Binary entrypoint for the `lineage` CLI.

use std::process::ExitCode;

use lineage_gate::config::Settings;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let settings = Settings::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match lineage_gate::run(std::env::args()) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
