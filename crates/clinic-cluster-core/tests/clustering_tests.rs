//! End-to-end clustering tests against the SQLite store.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use clinic_cluster_core::cluster::{ClusterEngine, ClusterError};
use clinic_cluster_core::db::{AssignmentSink, ConsultationSource, Database, DbResult};
use clinic_cluster_core::models::{
    ClusterAssignment, ClusterRun, ConsultationRecord, DiseaseId, PatientProfile, ReconcileMode,
};
use clinic_cluster_core::{open_database, EngineConfig};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Catalog [1, 2, 3]; record 1 is a 20-year-old student with {1, 3},
/// record 2 a 50-year-old staff member with {2}.
fn example_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.insert_disease(1, "Influenza").unwrap();
    db.insert_disease(2, "Hypertension").unwrap();
    db.insert_disease(3, "Conjunctivitis").unwrap();

    db.insert_patient(1, &PatientProfile::new(date(2003, 1, 1)).with_role("Student"))
        .unwrap();
    db.insert_patient(2, &PatientProfile::new(date(1973, 1, 1)).with_role("Staff"))
        .unwrap();

    db.insert_consultation(1, Some(1), Some(date(2023, 6, 1))).unwrap();
    db.link_disease(1, 1).unwrap();
    db.link_disease(1, 3).unwrap();
    db.insert_consultation(2, Some(2), Some(date(2023, 6, 1))).unwrap();
    db.link_disease(2, 2).unwrap();
    db
}

/// A clinic population with three obvious groups and some ineligible rows.
fn population_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    for (id, name) in [(1, "Influenza"), (2, "Dengue"), (3, "Hypertension"), (4, "Diabetes")] {
        db.insert_disease(id, name).unwrap();
    }

    db.insert_patient(1, &PatientProfile::new(date(2004, 3, 1)).with_role("Student"))
        .unwrap();
    db.insert_patient(2, &PatientProfile::new(date(1960, 3, 1)).with_role("Faculty"))
        .unwrap();
    db.insert_patient(3, &PatientProfile::new(date(1990, 3, 1)).with_category("rcy"))
        .unwrap();

    let mut next_id = 1;
    let mut add = |patient: i64, diseases: &[DiseaseId]| {
        db.insert_consultation(next_id, Some(patient), Some(date(2024, 5, 1)))
            .unwrap();
        for &disease in diseases {
            db.link_disease(next_id, disease).unwrap();
        }
        next_id += 1;
    };
    for _ in 0..4 {
        add(1, &[1, 2]);
    }
    for _ in 0..3 {
        add(2, &[3, 4]);
    }
    for _ in 0..3 {
        add(3, &[2]);
    }

    // Ineligible: no patient, no date, no diseases
    db.insert_consultation(100, None, Some(date(2024, 5, 2))).unwrap();
    db.link_disease(100, 1).unwrap();
    db.insert_consultation(101, Some(1), None).unwrap();
    db.link_disease(101, 1).unwrap();
    db.insert_consultation(102, Some(2), Some(date(2024, 5, 2))).unwrap();
    db
}

#[test]
fn test_example_scenario_splits_records() {
    let mut db = example_db();
    let outcome = ClusterEngine::new(&mut db).cluster(2).unwrap();

    assert_eq!(outcome.assignments.len(), 2);
    assert_ne!(outcome.assignments[&1], outcome.assignments[&2]);
    assert_eq!(db.list_assignments().unwrap(), outcome.assignment_list());
}

#[test]
fn test_insufficient_data_writes_nothing() {
    let mut db = example_db();
    let err = ClusterEngine::new(&mut db).cluster(3).unwrap_err();

    match &err {
        ClusterError::InsufficientData {
            required,
            available,
        } => {
            assert_eq!(*required, 3);
            assert_eq!(*available, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("3 eligible consultations required, 2 available"));
    assert!(db.list_assignments().unwrap().is_empty());
    assert!(db.latest_run().unwrap().is_none());
}

#[test]
fn test_completeness_and_validity() {
    let mut db = population_db();
    let eligible: BTreeSet<i64> = db
        .list_eligible_consultations()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(eligible.len(), 10);

    let config = EngineConfig::default().with_seed(2024);
    let outcome = ClusterEngine::with_config(&mut db, config).cluster(3).unwrap();

    let assigned: BTreeSet<i64> = outcome.assignments.keys().copied().collect();
    assert_eq!(assigned, eligible);
    assert!(outcome.assignments.values().all(|&label| label < 3));
    assert!(outcome.cluster_sizes().iter().all(|&size| size > 0));

    let mut sizes = outcome.cluster_sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![3, 3, 4]);
}

#[test]
fn test_rerun_replaces_previous_assignments() {
    let mut db = population_db();
    ClusterEngine::new(&mut db).cluster(3).unwrap();
    let second = ClusterEngine::new(&mut db).cluster(2).unwrap();

    let stored = db.list_assignments().unwrap();
    assert_eq!(stored, second.assignment_list());
    assert!(stored.iter().all(|a| a.cluster < 2));
    assert_eq!(db.list_runs(10).unwrap().len(), 2);
    assert_eq!(db.latest_run().unwrap().unwrap().k, 2);
}

#[test]
fn test_failed_run_keeps_previous_assignments() {
    let mut db = population_db();
    let first = ClusterEngine::new(&mut db).cluster(3).unwrap();

    let err = ClusterEngine::new(&mut db).cluster(50).unwrap_err();
    assert!(matches!(err, ClusterError::InsufficientData { .. }));
    assert_eq!(db.list_assignments().unwrap(), first.assignment_list());
}

/// Wraps the SQLite store and corrupts the write halfway: the real delete
/// runs, then an insert for a consultation that does not exist fails.
struct FailingWrites(Database);

impl ConsultationSource for FailingWrites {
    fn list_consultations(&self) -> DbResult<Vec<ConsultationRecord>> {
        self.0.list_consultations()
    }

    fn list_disease_catalog(&self) -> DbResult<Vec<DiseaseId>> {
        self.0.list_disease_catalog()
    }
}

impl AssignmentSink for FailingWrites {
    fn replace_all_assignments(
        &mut self,
        assignments: &[ClusterAssignment],
        run: &ClusterRun,
    ) -> DbResult<()> {
        let mut poisoned = assignments.to_vec();
        poisoned.push(ClusterAssignment::new(9_999, 0));
        self.0.replace_all_assignments(&poisoned, run)
    }
}

#[test]
fn test_write_failure_is_atomic() {
    let mut db = population_db();
    let first = ClusterEngine::new(&mut db).cluster(3).unwrap();
    let before = db.list_assignments().unwrap();
    assert_eq!(before, first.assignment_list());

    let mut failing = FailingWrites(db);
    let err = ClusterEngine::new(&mut failing).cluster(2).unwrap_err();
    assert!(matches!(err, ClusterError::DataAccess(_)));

    let db = failing.0;
    assert_eq!(db.list_assignments().unwrap(), before);
    assert_eq!(db.list_runs(10).unwrap().len(), 1);
}

#[test]
fn test_match_by_value_agrees_with_carry_ids() {
    let mut db = population_db();

    let carry = ClusterEngine::with_config(&mut db, EngineConfig::default().with_seed(8))
        .cluster(3)
        .unwrap();
    let by_value = ClusterEngine::with_config(
        &mut db,
        EngineConfig::default()
            .with_seed(8)
            .with_reconcile(ReconcileMode::MatchByValue),
    )
    .cluster(3)
    .unwrap();

    // Labels may differ; the grouping may not.
    for (a, label_a) in &carry.assignments {
        for (b, label_b) in &carry.assignments {
            assert_eq!(
                label_a == label_b,
                by_value.assignments[a] == by_value.assignments[b],
                "consultations {a} and {b}"
            );
        }
    }
    assert_eq!(
        db.latest_run().unwrap().unwrap().reconcile_mode,
        ReconcileMode::MatchByValue
    );
}

#[test]
fn test_facade_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.sqlite");
    {
        let db = Database::open(&path).unwrap();
        db.insert_disease(1, "Influenza").unwrap();
        db.insert_patient(1, &PatientProfile::new(date(2000, 1, 1))).unwrap();
        for id in 1..=3 {
            db.insert_consultation(id, Some(1), Some(date(2024, 1, id as u32)))
                .unwrap();
            db.link_disease(id, 1).unwrap();
        }
    }

    let core = open_database(&path, EngineConfig::default().with_seed(1)).unwrap();
    let summary = core.run_clustering(1).unwrap();
    assert_eq!(summary.clusters_written, 3);
    assert_eq!(summary.cluster_sizes, vec![3]);
    drop(core);

    let reopened = Database::open(&path).unwrap();
    assert_eq!(reopened.list_assignments().unwrap().len(), 3);
    assert_eq!(reopened.latest_run().unwrap().unwrap().run_id, summary.run_id);
}
