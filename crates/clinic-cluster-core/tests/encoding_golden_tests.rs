//! Golden tests for consultation feature encoding.
//!
//! These tests verify age buckets, role codes and disease flags against
//! hand-computed vectors.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use clinic_cluster_core::cluster::DiseaseCatalog;
use clinic_cluster_core::models::{EligibleConsultation, PatientProfile};

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    birthdate: (i32, u32, u32),
    consulted: (i32, u32, u32),
    role_name: Option<&'static str>,
    role_category: Option<&'static str>,
    diseases: &'static [i64],
    expected: &'static [f64],
}

/// Catalog shared by every case: columns for diseases 1, 2, 3.
const CATALOG: [i64; 3] = [3, 1, 2];

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "student-two-diseases",
            birthdate: (2003, 1, 15),
            consulted: (2023, 9, 1),
            role_name: Some("Student"),
            role_category: None,
            diseases: &[1, 3],
            expected: &[1.0, 0.0, 1.0, 0.0, 1.0],
        },
        GoldenCase {
            id: "senior-staff",
            birthdate: (1973, 5, 5),
            consulted: (2023, 9, 1),
            role_name: Some("Staff"),
            role_category: None,
            diseases: &[2],
            expected: &[4.0, 2.0, 0.0, 1.0, 0.0],
        },
        GoldenCase {
            id: "exactly-seventeen",
            birthdate: (2006, 9, 1),
            consulted: (2023, 9, 1),
            role_name: Some("Student"),
            role_category: None,
            diseases: &[1],
            expected: &[0.0, 0.0, 1.0, 0.0, 0.0],
        },
        GoldenCase {
            id: "eighteen-today",
            birthdate: (2005, 9, 1),
            consulted: (2023, 9, 1),
            role_name: Some("Student"),
            role_category: None,
            diseases: &[1],
            expected: &[1.0, 0.0, 1.0, 0.0, 0.0],
        },
        GoldenCase {
            id: "eighteen-tomorrow",
            birthdate: (2005, 9, 2),
            consulted: (2023, 9, 1),
            role_name: Some("Student"),
            role_category: None,
            diseases: &[1],
            expected: &[0.0, 0.0, 1.0, 0.0, 0.0],
        },
        GoldenCase {
            id: "rcy-staff-counts-as-student",
            birthdate: (1995, 3, 3),
            consulted: (2023, 9, 1),
            role_name: Some("Staff"),
            role_category: Some("rcy"),
            diseases: &[2, 3],
            expected: &[2.0, 0.0, 0.0, 1.0, 1.0],
        },
        GoldenCase {
            id: "faculty-thirty-one",
            birthdate: (1992, 1, 1),
            consulted: (2023, 1, 1),
            role_name: Some("Faculty"),
            role_category: Some("employee"),
            diseases: &[1, 2, 3],
            expected: &[3.0, 1.0, 1.0, 1.0, 1.0],
        },
        GoldenCase {
            id: "forty-five-upper-bound",
            birthdate: (1978, 12, 31),
            consulted: (2023, 12, 31),
            role_name: Some("Faculty"),
            role_category: None,
            diseases: &[3],
            expected: &[3.0, 1.0, 0.0, 0.0, 1.0],
        },
        GoldenCase {
            id: "unknown-role",
            birthdate: (2000, 6, 1),
            consulted: (2023, 6, 1),
            role_name: None,
            role_category: None,
            diseases: &[2],
            expected: &[2.0, 3.0, 0.0, 1.0, 0.0],
        },
        GoldenCase {
            id: "disease-outside-catalog",
            birthdate: (2001, 6, 1),
            consulted: (2023, 6, 1),
            role_name: Some("Dependent"),
            role_category: None,
            diseases: &[2, 99],
            expected: &[1.0, 3.0, 0.0, 1.0, 0.0],
        },
    ]
}

fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn consultation(case: &GoldenCase) -> EligibleConsultation {
    let mut patient = PatientProfile::new(date(case.birthdate));
    patient.role_name = case.role_name.map(String::from);
    patient.role_category = case.role_category.map(String::from);
    EligibleConsultation {
        id: 1,
        patient,
        consultation_date: date(case.consulted),
        disease_ids: case.diseases.iter().copied().collect::<BTreeSet<_>>(),
    }
}

#[test]
fn test_golden_encodings() {
    let catalog = DiseaseCatalog::new(CATALOG.to_vec());
    let mut failures = Vec::new();

    for case in get_golden_cases() {
        let vector = catalog.encode(&consultation(&case));
        if vector.as_slice() != case.expected {
            failures.push(format!(
                "{}: expected {:?}, got {:?}",
                case.id,
                case.expected,
                vector.as_slice()
            ));
        }
    }

    assert!(failures.is_empty(), "Golden failures:\n{}", failures.join("\n"));
}

#[test]
fn test_encoding_independent_of_catalog_input_order() {
    let forward = DiseaseCatalog::new(vec![1, 2, 3]);
    let shuffled = DiseaseCatalog::new(CATALOG.to_vec());

    for case in get_golden_cases() {
        let record = consultation(&case);
        assert_eq!(
            forward.encode(&record),
            shuffled.encode(&record),
            "case {}",
            case.id
        );
    }
    assert_eq!(forward.fingerprint(), shuffled.fingerprint());
}
