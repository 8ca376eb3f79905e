//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cluster::KMeansConfig;
use crate::models::ReconcileMode;

/// Default iteration cap per k-means restart.
pub const DEFAULT_MAX_ITERATIONS: usize = 300;
/// Default centroid-shift tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Default number of k-means restarts.
pub const DEFAULT_N_INIT: usize = 10;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tuning for a clustering run. `k` is supplied per run, not configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub n_init: usize,
    pub seed: Option<u64>,
    pub reconcile: ReconcileMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            n_init: DEFAULT_N_INIT,
            seed: None,
            reconcile: ReconcileMode::CarryIds,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse from JSON text. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_reconcile(mut self, reconcile: ReconcileMode) -> Self {
        self.reconcile = reconcile;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid("max_iterations must be at least 1".into()));
        }
        if self.n_init == 0 {
            return Err(ConfigError::Invalid("n_init must be at least 1".into()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    /// K-means parameters for a run with `k` clusters.
    pub fn kmeans(&self, k: usize) -> KMeansConfig {
        let config = KMeansConfig::new(k)
            .with_max_iterations(self.max_iterations)
            .with_tolerance(self.tolerance)
            .with_n_init(self.n_init);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}
