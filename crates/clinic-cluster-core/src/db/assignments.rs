//! Cluster assignment and run history database operations.

use rusqlite::{params, OptionalExtension};

use super::{AssignmentSink, Database, DbError, DbResult};
use crate::models::{ClusterAssignment, ClusterRun, ReconcileMode};

const RUN_COLUMNS: &str = r#"
    run_id, k, sample_count, iterations, inertia,
    catalog_fingerprint, reconcile_mode, created_at
"#;

impl Database {
    /// List stored assignments ordered by consultation ID.
    pub fn list_assignments(&self) -> DbResult<Vec<ClusterAssignment>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT consultation_id, cluster
            FROM consultation_clusters
            ORDER BY consultation_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ClusterAssignment {
                consultation_id: row.get(0)?,
                cluster: row.get::<_, i64>(1)? as usize,
            })
        })?;

        let mut assignments = Vec::new();
        for row in rows {
            assignments.push(row?);
        }
        Ok(assignments)
    }

    /// Get the most recent clustering run.
    pub fn latest_run(&self) -> DbResult<Option<ClusterRun>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM cluster_runs ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    RUN_COLUMNS
                ),
                [],
                |row| {
                    Ok(RunRow {
                        run_id: row.get(0)?,
                        k: row.get(1)?,
                        sample_count: row.get(2)?,
                        iterations: row.get(3)?,
                        inertia: row.get(4)?,
                        catalog_fingerprint: row.get(5)?,
                        reconcile_mode: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                },
            )
            .optional()?
            .map(ClusterRun::try_from)
            .transpose()
    }

    /// List clustering runs, newest first.
    pub fn list_runs(&self, limit: usize) -> DbResult<Vec<ClusterRun>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cluster_runs ORDER BY created_at DESC, rowid DESC LIMIT ?",
            RUN_COLUMNS
        ))?;

        let rows = stmt.query_map([limit as i64], |row| {
            Ok(RunRow {
                run_id: row.get(0)?,
                k: row.get(1)?,
                sample_count: row.get(2)?,
                iterations: row.get(3)?,
                inertia: row.get(4)?,
                catalog_fingerprint: row.get(5)?,
                reconcile_mode: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut runs = Vec::new();
        for row in rows {
            runs.push(ClusterRun::try_from(row?)?);
        }
        Ok(runs)
    }
}

impl AssignmentSink for Database {
    fn replace_all_assignments(
        &mut self,
        assignments: &[ClusterAssignment],
        run: &ClusterRun,
    ) -> DbResult<()> {
        // Dropping the transaction on any error rolls back the delete too.
        let tx = self.transaction()?;

        tx.execute("DELETE FROM consultation_clusters", [])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO consultation_clusters (consultation_id, cluster) VALUES (?1, ?2)",
            )?;
            for assignment in assignments {
                insert.execute(params![
                    assignment.consultation_id,
                    assignment.cluster as i64
                ])?;
            }
        }

        tx.execute(
            &format!(
                "INSERT INTO cluster_runs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                RUN_COLUMNS
            ),
            params![
                run.run_id,
                run.k as i64,
                run.sample_count as i64,
                run.iterations as i64,
                run.inertia,
                run.catalog_fingerprint,
                run.reconcile_mode.as_str(),
                run.created_at,
            ],
        )?;

        tx.commit()?;
        Ok(())
    }
}

/// Intermediate row type for run deserialization.
struct RunRow {
    run_id: String,
    k: i64,
    sample_count: i64,
    iterations: i64,
    inertia: f64,
    catalog_fingerprint: String,
    reconcile_mode: String,
    created_at: String,
}

impl TryFrom<RunRow> for ClusterRun {
    type Error = DbError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        let reconcile_mode = ReconcileMode::from_str(&row.reconcile_mode).ok_or_else(|| {
            DbError::Constraint(format!("unknown reconcile mode: {}", row.reconcile_mode))
        })?;

        Ok(ClusterRun {
            run_id: row.run_id,
            k: row.k as usize,
            sample_count: row.sample_count as usize,
            iterations: row.iterations as usize,
            inertia: row.inertia,
            catalog_fingerprint: row.catalog_fingerprint,
            reconcile_mode,
            created_at: row.created_at,
        })
    }
}
