//! Clinic Cluster Core Library
//!
//! Groups university clinic consultations by k-means to surface
//! population-level disease patterns.
//!
//! # Architecture
//!
//! ```text
//! consultations + patients + diseases (SQLite)
//!                  │
//!          [load & filter eligible]
//!                  │
//!     encode: [age_group, role, flag_1 … flag_N]
//!                  │
//!       k-means (ids carried as tags)
//!                  │
//!   ┌──────────────▼──────────────┐
//!   │  replace_all_assignments    │
//!   │  (one transaction: delete,  │
//!   │   insert, append run row)   │
//!   └──────────────┬──────────────┘
//!                  │
//!         cluster profiles (dashboards)
//! ```
//!
//! # Core Principle
//!
//! **A run either replaces every assignment or none.** All validation and
//! clustering happen before the single write transaction.
//!
//! # Modules
//!
//! - [`db`]: SQLite store and the read/write traits the engine consumes
//! - [`models`]: Domain types (ConsultationRecord, ClusterAssignment, etc.)
//! - [`cluster`]: Feature encoding, k-means, reconciliation, profiles
//! - [`config`]: Engine tuning

pub mod cluster;
pub mod config;
pub mod db;
pub mod models;

// Re-export commonly used types
pub use cluster::{
    build_profiles, ClusterEngine, ClusterError, ClusterOutcome, ClusterProfile, DiseaseCatalog,
    FeatureVector,
};
pub use config::{ConfigError, EngineConfig};
pub use db::{AssignmentSink, ConsultationSource, Database, DbError};
pub use models::{
    ClusterAssignment, ClusterRun, ConsultationId, ConsultationRecord, DiseaseId,
    EligibleConsultation, PatientProfile, ReconcileMode,
};

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

// =========================================================================
// Facade Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClinicClusterError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient data: {required} eligible consultations required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Clustering error: {0}")]
    ClusteringError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<db::DbError> for ClinicClusterError {
    fn from(e: db::DbError) -> Self {
        ClinicClusterError::DatabaseError(e.to_string())
    }
}

impl From<ClusterError> for ClinicClusterError {
    fn from(e: ClusterError) -> Self {
        match e {
            ClusterError::InvalidArgument(msg) => ClinicClusterError::InvalidInput(msg),
            ClusterError::InsufficientData {
                required,
                available,
            } => ClinicClusterError::InsufficientData {
                required,
                available,
            },
            ClusterError::DataAccess(e) => e.into(),
            ClusterError::Reconciliation(msg) => ClinicClusterError::ClusteringError(msg),
        }
    }
}

impl From<ConfigError> for ClinicClusterError {
    fn from(e: ConfigError) -> Self {
        ClinicClusterError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicClusterError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicClusterError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions
// =========================================================================

/// Open or create a database at the given path.
pub fn open_database<P: AsRef<Path>>(
    path: P,
    config: EngineConfig,
) -> Result<Arc<ClinicCluster>, ClinicClusterError> {
    let db = Database::open(path)?;
    ClinicCluster::new(db, config)
}

/// Create an in-memory database (for testing).
pub fn open_database_in_memory(
    config: EngineConfig,
) -> Result<Arc<ClinicCluster>, ClinicClusterError> {
    let db = Database::open_in_memory()?;
    ClinicCluster::new(db, config)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Outcome of `run_clustering`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringSummary {
    /// Number of consultation assignments written
    pub clusters_written: usize,
    pub run_id: String,
    pub k: usize,
    pub iterations: usize,
    pub inertia: f64,
    /// Member count per label
    pub cluster_sizes: Vec<usize>,
}

/// Thread-safe database wrapper. The mutex serializes clustering runs.
pub struct ClinicCluster {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
}

impl ClinicCluster {
    fn new(db: Database, config: EngineConfig) -> Result<Arc<Self>, ClinicClusterError> {
        config.validate()?;
        Ok(Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            config,
        }))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Clustering Operations
    // =========================================================================

    /// Recluster every eligible consultation into `k` groups, replacing the
    /// stored assignment set.
    pub fn run_clustering(&self, k: usize) -> Result<ClusteringSummary, ClinicClusterError> {
        let mut db = self.db.lock()?;
        let mut engine = ClusterEngine::with_config(&mut *db, self.config.clone());
        let outcome = engine.cluster(k)?;

        Ok(ClusteringSummary {
            clusters_written: outcome.assignments.len(),
            run_id: outcome.run.run_id.clone(),
            k: outcome.run.k,
            iterations: outcome.run.iterations,
            inertia: outcome.run.inertia,
            cluster_sizes: outcome.cluster_sizes(),
        })
    }

    /// Profiles of the stored assignment set.
    ///
    /// Eligible consultations are re-encoded against the current catalog and
    /// grouped by their stored label. Consultations without a stored label
    /// are left out.
    pub fn cluster_profiles(&self) -> Result<Vec<ClusterProfile>, ClinicClusterError> {
        let db = self.db.lock()?;
        let labels: BTreeMap<ConsultationId, usize> = db
            .list_assignments()?
            .into_iter()
            .map(|a| (a.consultation_id, a.cluster))
            .collect();
        let k = match db.latest_run()? {
            Some(run) => run.k,
            None => labels.values().max().map_or(0, |max| max + 1),
        };

        let catalog = DiseaseCatalog::new(db.list_disease_catalog()?);
        let mut groups: Vec<Vec<FeatureVector>> = vec![Vec::new(); k];
        for consultation in db.list_eligible_consultations()? {
            if let Some(&label) = labels.get(&consultation.id) {
                if label < k {
                    groups[label].push(catalog.encode(&consultation));
                }
            }
        }

        Ok(build_profiles(&groups, &catalog))
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Stored assignments ordered by consultation ID.
    pub fn assignments(&self) -> Result<Vec<ClusterAssignment>, ClinicClusterError> {
        let db = self.db.lock()?;
        Ok(db.list_assignments()?)
    }

    /// Most recent clustering run.
    pub fn latest_run(&self) -> Result<Option<ClusterRun>, ClinicClusterError> {
        let db = self.db.lock()?;
        Ok(db.latest_run()?)
    }

    /// Clustering runs, newest first.
    pub fn runs(&self, limit: u32) -> Result<Vec<ClusterRun>, ClinicClusterError> {
        let db = self.db.lock()?;
        Ok(db.list_runs(limit as usize)?)
    }

    /// Run a closure against the underlying database (seeding, imports).
    pub fn with_database<T>(
        &self,
        f: impl FnOnce(&Database) -> Result<T, DbError>,
    ) -> Result<T, ClinicClusterError> {
        let db = self.db.lock()?;
        Ok(f(&db)?)
    }
}
