//! clinic-cluster: command-line trigger for the consultation clustering engine
//!
//! Reclusters consultations on demand and prints stored results as JSON.

mod cli;

use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use clinic_cluster_core::open_database;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};

/// Common result type used throughout the binary
pub type Result<T> = anyhow::Result<T>;

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.engine_config().context("loading engine config")?;
    let core = open_database(&args.database, config)
        .with_context(|| format!("opening database {}", args.database.display()))?;

    match &args.command {
        Command::Run { k, .. } => {
            let start = Instant::now();
            let summary = core.run_clustering(*k)?;
            tracing::info!(
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Clustering complete"
            );
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Assignments => {
            let assignments = core.assignments()?;
            println!("{}", serde_json::to_string_pretty(&assignments)?);
        }
        Command::Profiles => {
            let profiles = core.cluster_profiles()?;
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        Command::Runs { limit } => {
            let runs = core.runs(*limit)?;
            println!("{}", serde_json::to_string_pretty(&runs)?);
        }
    }

    Ok(())
}
