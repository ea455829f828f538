//! Job repository: persisted queue state for the analysis pipeline.
//!
//! Jobs survive process restarts so status can be polled long after
//! submission, from any process sharing the database. Every state
//! transition is a guarded UPDATE: the WHERE clause names the expected
//! current status, so a transition out of the wrong state (a double claim,
//! or any write to a terminal job) affects zero rows and is refused.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};
use crate::object_store::Locator;
use crate::worker::job::Job;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub analysis_type: String,
    pub bucket: String,
    pub object_key: String,
    pub filename: String,
    pub strain_id: i64,
    pub owner_id: i64,
    pub status: String,
    pub result_id: Option<i64>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub submitted_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            analysis_type: row.get("analysis_type")?,
            bucket: row.get("bucket")?,
            object_key: row.get("object_key")?,
            filename: row.get("filename")?,
            strain_id: row.get("strain_id")?,
            owner_id: row.get("owner_id")?,
            status: row.get("status")?,
            result_id: row.get("result_id")?,
            error_kind: row.get("error_kind")?,
            error_message: row.get("error_message")?,
            submitted_at: row.get("submitted_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }

    /// Reconstructs an executable job from this row. Returns `None` (with a
    /// warning) when the stored format string no longer parses.
    pub fn to_job(&self) -> Option<Job> {
        let format = match self.analysis_type.parse() {
            Ok(f) => f,
            Err(e) => {
                log::warn!("Job {} has an unusable format: {}", self.id, e);
                return None;
            }
        };
        let submitted_at = DateTime::parse_from_rfc3339(&self.submitted_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|e| {
                log::warn!("Job {} has an unparseable timestamp: {}", self.id, e);
                Utc::now()
            });

        Some(Job {
            id: self.id.clone(),
            format,
            locator: Locator::new(self.bucket.clone(), self.object_key.clone()),
            filename: self.filename.clone(),
            strain_id: self.strain_id,
            owner_id: self.owner_id,
            submitted_at,
        })
    }
}

/// Inserts a freshly submitted job in the PENDING state.
pub fn insert_pending(db: &Database, job: &Job) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO jobs (id, analysis_type, bucket, object_key, filename,
             strain_id, owner_id, status, submitted_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.format.as_str(),
                job.locator.bucket,
                job.locator.key,
                job.filename,
                job.strain_id,
                job.owner_id,
                STATUS_PENDING,
                job.submitted_at.to_rfc3339(),
                now,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        conn.query_row(
            "SELECT * FROM jobs WHERE id = ?1",
            params![id],
            JobRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)
    })
}

/// All PENDING jobs, oldest submission first (FIFO recovery order).
pub fn list_pending(db: &Database) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM jobs WHERE status = ?1 ORDER BY submitted_at ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![STATUS_PENDING], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Claims a job: PENDING → RUNNING. Returns `false` if the job was not in
/// the PENDING state, i.e. another worker already claimed it.
pub fn mark_running(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE jobs SET status = ?2, updated_at = ?3
             WHERE id = ?1 AND status = ?4",
            params![id, STATUS_RUNNING, Utc::now().to_rfc3339(), STATUS_PENDING],
        )?;
        Ok(affected == 1)
    })
}

/// RUNNING → SUCCEEDED, recording the created analysis id.
pub fn mark_succeeded(db: &Database, id: &str, result_id: i64) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let now = Utc::now().to_rfc3339();
        let affected = conn.execute(
            "UPDATE jobs SET status = ?2, result_id = ?3, updated_at = ?4, completed_at = ?4
             WHERE id = ?1 AND status = ?5",
            params![id, STATUS_SUCCEEDED, result_id, now, STATUS_RUNNING],
        )?;
        Ok(affected == 1)
    })
}

/// RUNNING → FAILED, recording the error descriptor.
pub fn mark_failed(
    db: &Database,
    id: &str,
    error_kind: &str,
    error_message: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let now = Utc::now().to_rfc3339();
        let affected = conn.execute(
            "UPDATE jobs SET status = ?2, error_kind = ?3, error_message = ?4,
             updated_at = ?5, completed_at = ?5
             WHERE id = ?1 AND status = ?6",
            params![id, STATUS_FAILED, error_kind, error_message, now, STATUS_RUNNING],
        )?;
        Ok(affected == 1)
    })
}
