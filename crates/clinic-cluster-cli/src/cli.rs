//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clinic_cluster_core::{EngineConfig, ReconcileMode};

/// Consultation clustering for clinic population patterns
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the clinic SQLite database
    #[arg(short, long, env = "CLINIC_CLUSTER_DB", default_value = "clinic.sqlite")]
    pub database: PathBuf,

    /// JSON file with engine settings (max_iterations, tolerance, n_init, seed, reconcile)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recluster all eligible consultations and replace stored assignments
    Run {
        /// Number of clusters
        #[arg(short)]
        k: usize,

        /// RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration cap per k-means restart
        #[arg(long)]
        max_iterations: Option<usize>,

        /// Match partitioned vectors back to consultations by value
        #[arg(long)]
        match_by_value: bool,
    },

    /// Print stored assignments as JSON
    Assignments,

    /// Print per-cluster profiles of the stored assignments as JSON
    Profiles,

    /// Print recent clustering runs as JSON
    Runs {
        /// Number of runs to show
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

impl Args {
    /// Engine settings: config file first, then command-line overrides.
    pub fn engine_config(&self) -> crate::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };

        if let Command::Run {
            seed,
            max_iterations,
            match_by_value,
            ..
        } = &self.command
        {
            if let Some(seed) = seed {
                config = config.with_seed(*seed);
            }
            if let Some(max_iterations) = max_iterations {
                config = config.with_max_iterations(*max_iterations);
            }
            if *match_by_value {
                config = config.with_reconcile(ReconcileMode::MatchByValue);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Log filter used when RUST_LOG is not set.
    pub fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "clinic_cluster_core=debug,clinic_cluster_cli=debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from(["clinic-cluster", "--database", "x.sqlite", "run", "-k", "4"]);
        assert_eq!(args.database, PathBuf::from("x.sqlite"));
        assert!(matches!(args.command, Command::Run { k: 4, .. }));
    }

    #[test]
    fn test_run_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"seed": 1, "n_init": 2}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let args = Args::parse_from([
            "clinic-cluster",
            "--config",
            path.as_str(),
            "run",
            "-k",
            "3",
            "--seed",
            "99",
            "--match-by-value",
        ]);
        let config = args.engine_config().unwrap();
        assert_eq!(config.seed, Some(99));
        assert_eq!(config.n_init, 2);
        assert_eq!(config.reconcile, ReconcileMode::MatchByValue);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let args = Args::parse_from(["clinic-cluster", "run", "-k", "2", "--max-iterations", "0"]);
        assert!(args.engine_config().is_err());
    }

    #[test]
    fn test_verbose_filter() {
        let args = Args::parse_from(["clinic-cluster", "-v", "assignments"]);
        assert!(args.default_log_filter().contains("debug"));
    }
}
