//! Submission and status facade over the job store and the worker pool.

use std::sync::Arc;

use serde::Serialize;

use crate::db::analysis_repo::{self, AnalysisRow};
use crate::db::{job_repo, metadata_repo, Database};
use crate::error::DispatchError;
use crate::object_store::Locator;
use crate::parser::AnalysisFormat;
use crate::worker::{Job, WorkerPool};

/// A job's externally visible state. Serializes with a `state` tag so
/// clients can switch on it without probing optional fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum JobStatusResponse {
    Pending,
    Running,
    Succeeded { result_id: i64 },
    Failed { error_kind: String, error_message: String },
}

/// Front door for clients: validates references eagerly, persists the job,
/// then hands it to the pool. Cheap to clone and share across threads.
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    pool: Arc<WorkerPool>,
}

impl Dispatcher {
    pub fn new(db: Database, pool: Arc<WorkerPool>) -> Self {
        Self { db, pool }
    }

    /// Persists a new PENDING job and enqueues it. The strain is checked
    /// up front so a bad reference fails here, synchronously, instead of
    /// surfacing later as a failed job. Returns the job id.
    pub fn submit(
        &self,
        format: AnalysisFormat,
        locator: Locator,
        strain_id: i64,
        owner_id: i64,
    ) -> Result<String, DispatchError> {
        if !metadata_repo::strain_exists(&self.db, strain_id)? {
            return Err(DispatchError::UnknownStrain(strain_id));
        }

        let job = Job::new(format, locator, strain_id, owner_id);
        job_repo::insert_pending(&self.db, &job)?;
        log::info!(
            "Submitted job {} ({} on {}/{})",
            job.id,
            job.format,
            job.locator.bucket,
            job.locator.key
        );

        let id = job.id.clone();
        self.pool.submit(job)?;
        Ok(id)
    }

    /// Reads the job's current state from the database, so it answers
    /// correctly for jobs submitted by an earlier process too.
    pub fn status(&self, job_id: &str) -> Result<JobStatusResponse, DispatchError> {
        let row = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| DispatchError::UnknownJob(job_id.to_string()))?;

        let response = match row.status.as_str() {
            job_repo::STATUS_RUNNING => JobStatusResponse::Running,
            job_repo::STATUS_SUCCEEDED => JobStatusResponse::Succeeded {
                result_id: row.result_id.unwrap_or_else(|| {
                    log::warn!("Job {} succeeded without a result id", job_id);
                    0
                }),
            },
            job_repo::STATUS_FAILED => JobStatusResponse::Failed {
                error_kind: row.error_kind.unwrap_or_default(),
                error_message: row.error_message.unwrap_or_default(),
            },
            job_repo::STATUS_PENDING => JobStatusResponse::Pending,
            other => {
                log::warn!("Job {} has unrecognized status '{}'", job_id, other);
                JobStatusResponse::Pending
            }
        };
        Ok(response)
    }

    /// All analyses recorded for a strain, oldest first. Error records
    /// appear alongside successful results.
    pub fn analyses_for_strain(&self, strain_id: i64) -> Result<Vec<AnalysisRow>, DispatchError> {
        if !metadata_repo::strain_exists(&self.db, strain_id)? {
            return Err(DispatchError::UnknownStrain(strain_id));
        }
        Ok(analysis_repo::list_by_strain(&self.db, strain_id)?)
    }
}
