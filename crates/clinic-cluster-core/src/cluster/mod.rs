//! Consultation clustering engine.
//!
//! Pipeline: Load & Filter → Encode → K-Means → Reconcile → Replace Assignments

mod features;
mod kmeans;
mod profile;
mod reconcile;

pub use features::*;
pub use kmeans::*;
pub use profile::*;
pub use reconcile::*;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::config::EngineConfig;
use crate::db::{AssignmentSink, ConsultationSource, DbError};
use crate::models::{ClusterAssignment, ClusterRun, ConsultationId, ReconcileMode};

/// Clustering errors.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient data: {required} eligible consultations required, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error("Data access error: {0}")]
    DataAccess(#[from] DbError),

    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),
}

impl From<ReconcileError> for ClusterError {
    fn from(e: ReconcileError) -> Self {
        ClusterError::Reconciliation(e.to_string())
    }
}

impl From<KMeansError> for ClusterError {
    fn from(e: KMeansError) -> Self {
        ClusterError::InvalidArgument(e.to_string())
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;

/// Encoded input of one run.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub catalog: DiseaseCatalog,
    /// Eligible consultations in load order, tagged with their IDs
    pub samples: Vec<Sample<ConsultationId>>,
}

/// Result of a clustering run.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Label of every eligible consultation
    pub assignments: BTreeMap<ConsultationId, usize>,
    pub run: ClusterRun,
    /// Centroids indexed by label
    pub centroids: Vec<Vec<f64>>,
    /// Member vectors indexed by label
    pub groups: Vec<Vec<FeatureVector>>,
}

impl ClusterOutcome {
    /// Assignments ordered by consultation ID.
    pub fn assignment_list(&self) -> Vec<ClusterAssignment> {
        self.assignments
            .iter()
            .map(|(&id, &cluster)| ClusterAssignment::new(id, cluster))
            .collect()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.groups.iter().map(Vec::len).collect()
    }
}

/// Clusters consultations from a store and writes the labels back to it.
pub struct ClusterEngine<'a, S> {
    store: &'a mut S,
    config: EngineConfig,
}

impl<'a, S> ClusterEngine<'a, S>
where
    S: ConsultationSource + AssignmentSink,
{
    /// Create an engine with default configuration.
    pub fn new(store: &'a mut S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: &'a mut S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load eligible consultations and encode them against the catalog.
    pub fn load(&self) -> ClusterResult<Snapshot> {
        let consultations = self.store.list_eligible_consultations()?;
        let catalog = DiseaseCatalog::new(self.store.list_disease_catalog()?);

        let loaded = consultations.len();
        let samples: Vec<Sample<ConsultationId>> = consultations
            .iter()
            .filter(|c| !c.disease_ids.is_empty())
            .map(|c| Sample::new(c.id, catalog.encode(c)))
            .collect();
        if samples.len() < loaded {
            tracing::warn!(
                skipped = loaded - samples.len(),
                "Skipped consultations without diseases"
            );
        }

        Ok(Snapshot { catalog, samples })
    }

    /// Partition a snapshot into `k` clusters without touching the store.
    pub fn compute(&self, snapshot: &Snapshot, k: usize) -> ClusterResult<ClusterOutcome> {
        if k == 0 {
            return Err(ClusterError::InvalidArgument(
                "cluster count must be a positive integer".into(),
            ));
        }
        let available = snapshot.samples.len();
        if available < k {
            return Err(ClusterError::InsufficientData {
                required: k,
                available,
            });
        }
        self.config
            .validate()
            .map_err(|e| ClusterError::InvalidArgument(e.to_string()))?;

        let kmeans = self.config.kmeans(k);
        let (labelled, centroids, groups, inertia, iterations) = match self.config.reconcile {
            ReconcileMode::CarryIds => {
                let fitted = partition(snapshot.samples.clone(), &kmeans)?;
                let mut labelled = Vec::with_capacity(available);
                let mut centroids = Vec::with_capacity(k);
                let mut groups = Vec::with_capacity(k);
                for cluster in fitted.clusters {
                    let mut vectors = Vec::with_capacity(cluster.members.len());
                    for member in cluster.members {
                        labelled.push((member.tag, cluster.label));
                        vectors.push(member.vector);
                    }
                    centroids.push(cluster.centroid);
                    groups.push(vectors);
                }
                (labelled, centroids, groups, fitted.inertia, fitted.iterations)
            }
            ReconcileMode::MatchByValue => {
                let bare: Vec<Sample<()>> = snapshot
                    .samples
                    .iter()
                    .map(|s| Sample::new((), s.vector.clone()))
                    .collect();
                let fitted = partition(bare, &kmeans)?;
                let mut centroids = Vec::with_capacity(k);
                let mut groups: Vec<Vec<FeatureVector>> = Vec::with_capacity(k);
                for cluster in fitted.clusters {
                    centroids.push(cluster.centroid);
                    groups.push(cluster.members.into_iter().map(|m| m.vector).collect());
                }
                let original: Vec<(ConsultationId, FeatureVector)> = snapshot
                    .samples
                    .iter()
                    .map(|s| (s.tag, s.vector.clone()))
                    .collect();
                let labelled = reconcile(&original, &groups)?;
                (labelled, centroids, groups, fitted.inertia, fitted.iterations)
            }
        };

        let mut assignments = BTreeMap::new();
        for (id, label) in labelled {
            if label >= k {
                return Err(ClusterError::Reconciliation(format!(
                    "consultation {} got label {} outside 0..{}",
                    id, label, k
                )));
            }
            if assignments.insert(id, label).is_some() {
                return Err(ClusterError::Reconciliation(format!(
                    "consultation {} assigned more than once",
                    id
                )));
            }
        }

        let run = ClusterRun::new(
            k,
            available,
            iterations,
            inertia,
            snapshot.catalog.fingerprint(),
            self.config.reconcile,
        );

        Ok(ClusterOutcome {
            assignments,
            run,
            centroids,
            groups,
        })
    }

    /// Cluster every eligible consultation into `k` groups and replace the
    /// stored assignments with the result.
    ///
    /// Nothing is written unless clustering succeeds.
    pub fn cluster(&mut self, k: usize) -> ClusterResult<ClusterOutcome> {
        let _span = tracing::info_span!("cluster_run", k).entered();

        let snapshot = self.load()?;
        tracing::info!(
            eligible = snapshot.samples.len(),
            diseases = snapshot.catalog.len(),
            "Loaded clustering snapshot"
        );

        let outcome = self.compute(&snapshot, k)?;
        self.store
            .replace_all_assignments(&outcome.assignment_list(), &outcome.run)?;

        tracing::info!(
            run_id = %outcome.run.run_id,
            written = outcome.assignments.len(),
            iterations = outcome.run.iterations,
            inertia = outcome.run.inertia,
            "Replaced cluster assignments"
        );
        Ok(outcome)
    }
}
