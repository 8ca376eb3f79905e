//! Consultation models.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::patient::PatientProfile;

/// Consultation identifier.
pub type ConsultationId = i64;

/// Disease identifier.
pub type DiseaseId = i64;

/// A consultation as stored, with every optional field the clinic allows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsultationRecord {
    /// Consultation ID
    pub id: ConsultationId,
    /// Patient seen, if the consultation is linked to one
    pub patient: Option<PatientProfile>,
    /// Date of the consultation
    pub consultation_date: Option<NaiveDate>,
    /// Diagnosed diseases
    pub disease_ids: BTreeSet<DiseaseId>,
}

impl ConsultationRecord {
    /// Create a consultation with no patient, date or diseases.
    pub fn new(id: ConsultationId) -> Self {
        Self {
            id,
            patient: None,
            consultation_date: None,
            disease_ids: BTreeSet::new(),
        }
    }

    /// Whether this record may take part in clustering.
    pub fn is_eligible(&self) -> bool {
        self.patient.is_some() && self.consultation_date.is_some() && !self.disease_ids.is_empty()
    }
}

/// A consultation that has a patient, a date and at least one disease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EligibleConsultation {
    pub id: ConsultationId,
    pub patient: PatientProfile,
    pub consultation_date: NaiveDate,
    pub disease_ids: BTreeSet<DiseaseId>,
}

impl EligibleConsultation {
    /// Project a stored record, returning `None` when it is not eligible.
    pub fn from_record(record: ConsultationRecord) -> Option<Self> {
        if record.disease_ids.is_empty() {
            return None;
        }
        Some(Self {
            id: record.id,
            patient: record.patient?,
            consultation_date: record.consultation_date?,
            disease_ids: record.disease_ids,
        })
    }

    /// Patient age in whole years at the consultation.
    pub fn patient_age(&self) -> i32 {
        self.patient.age_on(self.consultation_date)
    }
}
