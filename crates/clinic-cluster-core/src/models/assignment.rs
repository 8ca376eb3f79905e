//! Cluster assignment models.

use serde::{Deserialize, Serialize};

use super::consultation::ConsultationId;

/// How partitioned vectors are mapped back to consultation IDs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileMode {
    /// IDs travel with their vectors through k-means
    #[default]
    CarryIds,
    /// Bare vectors are matched back to the first unclaimed equal vector
    MatchByValue,
}

impl ReconcileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileMode::CarryIds => "carry_ids",
            ReconcileMode::MatchByValue => "match_by_value",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "carry_ids" => Some(ReconcileMode::CarryIds),
            "match_by_value" => Some(ReconcileMode::MatchByValue),
            _ => None,
        }
    }
}

/// One consultation's cluster label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClusterAssignment {
    pub consultation_id: ConsultationId,
    pub cluster: usize,
}

impl ClusterAssignment {
    pub fn new(consultation_id: ConsultationId, cluster: usize) -> Self {
        Self {
            consultation_id,
            cluster,
        }
    }
}

/// Metadata for one clustering run.
///
/// Written in the same transaction as the run's assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterRun {
    /// Run ID (UUID v4)
    pub run_id: String,
    /// Requested cluster count
    pub k: usize,
    /// Number of eligible consultations clustered
    pub sample_count: usize,
    /// Lloyd iterations of the kept restart
    pub iterations: usize,
    /// Within-cluster sum of squared distances
    pub inertia: f64,
    /// SHA-256 of the disease catalog column order
    pub catalog_fingerprint: String,
    /// ID recovery strategy used
    pub reconcile_mode: ReconcileMode,
    /// Creation timestamp
    pub created_at: String,
}

impl ClusterRun {
    /// Create run metadata stamped with a fresh ID and the current time.
    pub fn new(
        k: usize,
        sample_count: usize,
        iterations: usize,
        inertia: f64,
        catalog_fingerprint: String,
        reconcile_mode: ReconcileMode,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            k,
            sample_count,
            iterations,
            inertia,
            catalog_fingerprint,
            reconcile_mode,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
