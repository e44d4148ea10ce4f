//! Worker node binary: polls a table node for trials and evaluates them.
//!
//! The actual objective function and any process-pool fan-out are out of
//! scope for the core (spec.md §1's "worker's internal fan-out runner is
//! not modeled"); callers embedding this crate supply their own
//! [`litetable::worker::TrialRunner`]. This binary wires up an identity
//! runner as a usable default so the node is runnable standalone.

use clap::Parser;
use litetable::config::WorkerConfig;
use litetable::trial::{Mapping, ResultValue, Trial};
use litetable::worker::TrialRunner;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "worker-node")]
struct Cli {
    /// Path to the worker config JSON file.
    #[arg(long, default_value = "worker_config.json")]
    config: PathBuf,
}

/// Maps every reserved point to its first parameter value, unchanged.
/// Stands in for a real objective function until one is supplied.
struct IdentityRunner;

impl TrialRunner for IdentityRunner {
    fn run(&self, trial: &Trial) -> Vec<Mapping> {
        trial
            .parameter_space
            .grid()
            .map(|params| {
                let result = params.first().cloned().unwrap_or(litetable::codec::Primitive::Int(0));
                Mapping { params, result: ResultValue::Scalar(result) }
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    litetable::telemetry::init();
    let cli = Cli::parse();
    let config = WorkerConfig::load_from_file(&cli.config)?;
    litetable::worker::run(config, &IdentityRunner).await
}
