//! SQLite schema definition.

/// Complete database schema for the clustering store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY,
    birthdate TEXT NOT NULL,                     -- YYYY-MM-DD
    role_name TEXT,                              -- Student, Faculty, Staff, ...
    role_category TEXT                           -- rcy, employee, ...
);

-- ============================================================================
-- Disease Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS diseases (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

-- ============================================================================
-- Consultations
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultations (
    id INTEGER PRIMARY KEY,
    patient_id INTEGER REFERENCES patients(id),  -- NULL for walk-ins without a record
    consultation_date TEXT                       -- YYYY-MM-DD, NULL until completed
);

CREATE INDEX IF NOT EXISTS idx_consultations_patient ON consultations(patient_id);

CREATE TABLE IF NOT EXISTS consultation_diseases (
    consultation_id INTEGER NOT NULL REFERENCES consultations(id),
    disease_id INTEGER NOT NULL REFERENCES diseases(id),
    PRIMARY KEY (consultation_id, disease_id)
);

CREATE INDEX IF NOT EXISTS idx_consultation_diseases_disease ON consultation_diseases(disease_id);

-- ============================================================================
-- Cluster Assignments (Replaced wholesale by each run)
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultation_clusters (
    consultation_id INTEGER PRIMARY KEY REFERENCES consultations(id),
    cluster INTEGER NOT NULL CHECK (cluster >= 0)
);

CREATE INDEX IF NOT EXISTS idx_consultation_clusters_cluster ON consultation_clusters(cluster);

-- ============================================================================
-- Cluster Runs (Append-only history)
-- ============================================================================

CREATE TABLE IF NOT EXISTS cluster_runs (
    run_id TEXT PRIMARY KEY,
    k INTEGER NOT NULL CHECK (k > 0),
    sample_count INTEGER NOT NULL,
    iterations INTEGER NOT NULL,
    inertia REAL NOT NULL,
    catalog_fingerprint TEXT NOT NULL,
    reconcile_mode TEXT NOT NULL CHECK (reconcile_mode IN ('carry_ids', 'match_by_value')),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cluster_runs_created ON cluster_runs(created_at);
"#;
