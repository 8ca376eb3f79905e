//! Consultation, patient and disease database operations.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rusqlite::params;

use super::{ConsultationSource, Database, DbResult};
use crate::models::{
    ConsultationId, ConsultationRecord, DiseaseId, EligibleConsultation, PatientProfile,
};

impl Database {
    /// Insert a patient.
    pub fn insert_patient(&self, patient_id: i64, patient: &PatientProfile) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (id, birthdate, role_name, role_category)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                patient_id,
                patient.birthdate,
                patient.role_name,
                patient.role_category,
            ],
        )?;
        Ok(())
    }

    /// Insert a disease into the catalog.
    pub fn insert_disease(&self, disease_id: DiseaseId, name: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO diseases (id, name) VALUES (?1, ?2)",
            params![disease_id, name],
        )?;
        Ok(())
    }

    /// Insert a consultation. Patient and date may be absent.
    pub fn insert_consultation(
        &self,
        consultation_id: ConsultationId,
        patient_id: Option<i64>,
        consultation_date: Option<NaiveDate>,
    ) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO consultations (id, patient_id, consultation_date)
            VALUES (?1, ?2, ?3)
            "#,
            params![consultation_id, patient_id, consultation_date],
        )?;
        Ok(())
    }

    /// Attach a diagnosed disease to a consultation. Repeated links are ignored.
    pub fn link_disease(
        &self,
        consultation_id: ConsultationId,
        disease_id: DiseaseId,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO consultation_diseases (consultation_id, disease_id)
            VALUES (?1, ?2)
            "#,
            params![consultation_id, disease_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Count consultations, eligible or not.
    pub fn count_consultations(&self) -> DbResult<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM consultations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Disease links for every consultation, keyed by consultation ID.
    fn disease_links(&self) -> DbResult<BTreeMap<ConsultationId, BTreeSet<DiseaseId>>> {
        let mut stmt = self.conn.prepare(
            "SELECT consultation_id, disease_id FROM consultation_diseases",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut links: BTreeMap<ConsultationId, BTreeSet<DiseaseId>> = BTreeMap::new();
        for row in rows {
            let (consultation_id, disease_id) = row?;
            links.entry(consultation_id).or_default().insert(disease_id);
        }
        Ok(links)
    }
}

/// Raw consultation row before disease links are attached.
struct ConsultationRow {
    id: ConsultationId,
    birthdate: Option<NaiveDate>,
    role_name: Option<String>,
    role_category: Option<String>,
    consultation_date: Option<NaiveDate>,
}

impl ConsultationSource for Database {
    fn list_consultations(&self) -> DbResult<Vec<ConsultationRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, p.birthdate, p.role_name, p.role_category, c.consultation_date
            FROM consultations c
            LEFT JOIN patients p ON p.id = c.patient_id
            ORDER BY c.id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ConsultationRow {
                id: row.get(0)?,
                birthdate: row.get(1)?,
                role_name: row.get(2)?,
                role_category: row.get(3)?,
                consultation_date: row.get(4)?,
            })
        })?;

        let mut links = self.disease_links()?;
        let mut records = Vec::new();
        for row in rows {
            let row = row?;
            // A LEFT JOIN miss leaves birthdate NULL; patients.birthdate is NOT NULL.
            let patient = row.birthdate.map(|birthdate| PatientProfile {
                birthdate,
                role_name: row.role_name,
                role_category: row.role_category,
            });
            records.push(ConsultationRecord {
                id: row.id,
                patient,
                consultation_date: row.consultation_date,
                disease_ids: links.remove(&row.id).unwrap_or_default(),
            });
        }
        Ok(records)
    }

    fn list_disease_catalog(&self) -> DbResult<Vec<DiseaseId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM diseases ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn list_eligible_consultations(&self) -> DbResult<Vec<EligibleConsultation>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT c.id, p.birthdate, p.role_name, p.role_category,
                   c.consultation_date, cd.disease_id
            FROM consultations c
            JOIN patients p ON p.id = c.patient_id
            JOIN consultation_diseases cd ON cd.consultation_id = c.id
            WHERE c.consultation_date IS NOT NULL
            ORDER BY c.id, cd.disease_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, ConsultationId>(0)?,
                row.get::<_, NaiveDate>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, NaiveDate>(4)?,
                row.get::<_, DiseaseId>(5)?,
            ))
        })?;

        // One row per (consultation, disease); rows of a consultation are adjacent.
        let mut consultations: Vec<EligibleConsultation> = Vec::new();
        for row in rows {
            let (id, birthdate, role_name, role_category, consultation_date, disease_id) = row?;
            match consultations.last_mut() {
                Some(last) if last.id == id => {
                    last.disease_ids.insert(disease_id);
                }
                _ => consultations.push(EligibleConsultation {
                    id,
                    patient: PatientProfile {
                        birthdate,
                        role_name,
                        role_category,
                    },
                    consultation_date,
                    disease_ids: BTreeSet::from([disease_id]),
                }),
            }
        }
        Ok(consultations)
    }
}
