//! Database layer for the clustering engine.
//!
//! The engine reads and writes through [`ConsultationSource`] and
//! [`AssignmentSink`]; [`Database`] is the SQLite implementation of both.

mod assignments;
mod consultations;
mod schema;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::{ClusterAssignment, ClusterRun, ConsultationRecord, DiseaseId, EligibleConsultation};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Read side of the store consumed by the clustering engine.
pub trait ConsultationSource {
    /// All consultation records, eligible or not.
    fn list_consultations(&self) -> DbResult<Vec<ConsultationRecord>>;

    /// All known disease IDs in ascending order.
    fn list_disease_catalog(&self) -> DbResult<Vec<DiseaseId>>;

    /// Consultations with a patient, a date and at least one disease.
    fn list_eligible_consultations(&self) -> DbResult<Vec<EligibleConsultation>> {
        Ok(self
            .list_consultations()?
            .into_iter()
            .filter_map(EligibleConsultation::from_record)
            .collect())
    }
}

/// Write side of the store consumed by the clustering engine.
pub trait AssignmentSink {
    /// Replace every stored assignment with `assignments` and record `run`.
    ///
    /// Must be all-or-nothing: on error the previous assignments remain.
    fn replace_all_assignments(
        &mut self,
        assignments: &[ClusterAssignment],
        run: &ClusterRun,
    ) -> DbResult<()>;
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction.
    pub fn transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}
