//! Feature encoding for consultations.
//!
//! A consultation becomes `[age_group, role, flag_1, ..., flag_N]` where the
//! flags follow the disease catalog in ascending ID order. Codes are used as
//! raw coordinates; nothing is scaled.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{DiseaseId, EligibleConsultation};

/// Number of leading non-disease columns.
pub const LEADING_COLUMNS: usize = 2;

/// Age bracket of the patient at consultation time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    /// 17 and under
    Minor,
    /// 18 to 22
    YoungAdult,
    /// 23 to 30
    Adult,
    /// 31 to 45
    MiddleAged,
    /// 46 and over
    Senior,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Minor,
        AgeGroup::YoungAdult,
        AgeGroup::Adult,
        AgeGroup::MiddleAged,
        AgeGroup::Senior,
    ];

    /// Bucket an age in whole years.
    pub fn from_age(age: i32) -> Self {
        match age {
            i32::MIN..=17 => AgeGroup::Minor,
            18..=22 => AgeGroup::YoungAdult,
            23..=30 => AgeGroup::Adult,
            31..=45 => AgeGroup::MiddleAged,
            _ => AgeGroup::Senior,
        }
    }

    pub fn code(self) -> usize {
        self as usize
    }

    pub fn from_code(code: usize) -> Option<Self> {
        Self::ALL.get(code).copied()
    }
}

/// Clinic role of the patient.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleCode {
    Student,
    Faculty,
    Staff,
    Other,
}

impl RoleCode {
    pub const ALL: [RoleCode; 4] = [
        RoleCode::Student,
        RoleCode::Faculty,
        RoleCode::Staff,
        RoleCode::Other,
    ];

    /// Classify a patient role.
    ///
    /// A "Student" role or the "rcy" category wins over every other check.
    pub fn classify(role_name: Option<&str>, role_category: Option<&str>) -> Self {
        if role_name == Some("Student") || role_category == Some("rcy") {
            return RoleCode::Student;
        }
        match role_name {
            Some("Faculty") => RoleCode::Faculty,
            Some("Staff") => RoleCode::Staff,
            _ => RoleCode::Other,
        }
    }

    pub fn code(self) -> usize {
        self as usize
    }

    pub fn from_code(code: usize) -> Option<Self> {
        Self::ALL.get(code).copied()
    }
}

/// Numeric representation of one consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Age group column, if the vector was produced by [`DiseaseCatalog::encode`].
    pub fn age_group(&self) -> Option<AgeGroup> {
        self.code_at(0).and_then(AgeGroup::from_code)
    }

    /// Role column, if the vector was produced by [`DiseaseCatalog::encode`].
    pub fn role(&self) -> Option<RoleCode> {
        self.code_at(1).and_then(RoleCode::from_code)
    }

    /// Disease flag columns in catalog order.
    pub fn disease_flags(&self) -> &[f64] {
        self.0.get(LEADING_COLUMNS..).unwrap_or(&[])
    }

    fn code_at(&self, index: usize) -> Option<usize> {
        self.0
            .get(index)
            .filter(|v| **v >= 0.0 && v.fract() == 0.0)
            .map(|v| *v as usize)
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Fixed, ascending list of disease IDs defining the flag columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseCatalog {
    ids: Vec<DiseaseId>,
}

impl DiseaseCatalog {
    /// Build a catalog. IDs are sorted ascending and deduplicated.
    pub fn new(mut ids: Vec<DiseaseId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    pub fn ids(&self) -> &[DiseaseId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Length of every vector this catalog encodes.
    pub fn dimension(&self) -> usize {
        LEADING_COLUMNS + self.ids.len()
    }

    /// Column index of a disease among the flags.
    pub fn position(&self, disease_id: DiseaseId) -> Option<usize> {
        self.ids.binary_search(&disease_id).ok()
    }

    /// SHA-256 hex digest of the column order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for id in &self.ids {
            hasher.update(id.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Encode a consultation against this catalog.
    ///
    /// Diseases missing from the catalog do not contribute a flag.
    pub fn encode(&self, consultation: &EligibleConsultation) -> FeatureVector {
        let age_group = AgeGroup::from_age(consultation.patient_age());
        let role = RoleCode::classify(
            consultation.patient.role_name.as_deref(),
            consultation.patient.role_category.as_deref(),
        );

        let mut values = Vec::with_capacity(self.dimension());
        values.push(age_group.code() as f64);
        values.push(role.code() as f64);
        values.extend(self.ids.iter().map(|id| {
            if consultation.disease_ids.contains(id) {
                1.0
            } else {
                0.0
            }
        }));
        FeatureVector(values)
    }
}
