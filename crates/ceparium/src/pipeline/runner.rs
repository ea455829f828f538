//! Per-job execution: claim, fetch, parse, persist, commit the outcome.

use std::io::BufReader;
use std::sync::Arc;

use tracing::info_span;

use crate::db::{analysis_repo, job_repo, Database, DatabaseError};
use crate::object_store::ObjectStore;
use crate::parser::{self, AnalysisPayload, ErrorPayload, ERROR_ANALYSIS_TYPE};
use crate::worker::job::{ErrorKind, Job, JobOutcome};

/// Runs one job end to end against the database and object store.
///
/// Errors never escape [`AnalysisPipeline::execute`]: every failure mode is
/// converted into a FAILED job state plus a best-effort error record, so a
/// bad file or an unreachable store can never take a worker down or leak
/// into other jobs.
pub struct AnalysisPipeline {
    db: Database,
    store: Arc<dyn ObjectStore>,
    endpoint: String,
}

impl AnalysisPipeline {
    pub fn new(db: Database, store: Arc<dyn ObjectStore>, endpoint: impl Into<String>) -> Self {
        Self {
            db,
            store,
            endpoint: endpoint.into(),
        }
    }

    /// Executes the job and commits its terminal state. Returns `None` when
    /// the claim was refused (the job was not PENDING), in which case
    /// nothing was changed.
    pub fn execute(&self, job: &Job) -> Option<JobOutcome> {
        let _span = info_span!("analysis_job",
            job_id = %job.id,
            format = %job.format,
            key = %job.locator.key,
        )
        .entered();

        match job_repo::mark_running(&self.db, &job.id) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("Job {} already claimed, skipping", job.id);
                return None;
            }
            Err(e) => {
                log::error!("Failed to claim job {}: {}", job.id, e);
                return None;
            }
        }

        let outcome = match self.run(job) {
            Ok(result_id) => JobOutcome::Succeeded { result_id },
            Err((kind, message)) => JobOutcome::Failed { kind, message },
        };

        match &outcome {
            JobOutcome::Succeeded { result_id } => {
                log::info!("Job {} succeeded, analysis {}", job.id, result_id);
                match job_repo::mark_succeeded(&self.db, &job.id, *result_id) {
                    Ok(true) => {}
                    Ok(false) => log::warn!("Job {} was not RUNNING at commit", job.id),
                    Err(e) => log::error!("Failed to commit success of job {}: {}", job.id, e),
                }
            }
            JobOutcome::Failed { kind, message } => {
                if *kind == ErrorKind::Persistence {
                    // Worst case: the parse succeeded but the result is lost.
                    log::error!("Job {} failed to persist its result: {}", job.id, message);
                } else {
                    log::warn!("Job {} failed ({}): {}", job.id, kind.as_str(), message);
                }
                match job_repo::mark_failed(&self.db, &job.id, kind.as_str(), message) {
                    Ok(true) => {}
                    Ok(false) => log::warn!("Job {} was not RUNNING at commit", job.id),
                    Err(e) => log::error!("Failed to commit failure of job {}: {}", job.id, e),
                }
                self.record_failure(job, *kind, message);
            }
        }

        Some(outcome)
    }

    /// The happy path. Any error carries the stage it belongs to; the
    /// object-store stream is closed when the reader goes out of scope,
    /// on success and on every error return alike.
    fn run(&self, job: &Job) -> Result<i64, (ErrorKind, String)> {
        let stream = self
            .store
            .fetch(&job.locator)
            .map_err(|e| (ErrorKind::Transport, e.to_string()))?;

        let payload = parser::parse_stream(job.format, BufReader::new(stream), &job.filename)
            .map_err(|e| (ErrorKind::Parse, e.to_string()))?;

        let results = serde_json::to_value(&payload)
            .map_err(|e| (ErrorKind::Persistence, e.to_string()))?;
        let file_url = job.locator.to_url(&self.endpoint);

        let row = analysis_repo::create(
            &self.db,
            payload.analysis_type(),
            &results,
            job.strain_id,
            job.owner_id,
            Some(&file_url),
        )
        .map_err(|e| match e {
            DatabaseError::StrainNotFound(id) => (
                ErrorKind::Persistence,
                format!("Strain {id} no longer exists"),
            ),
            other => (ErrorKind::Persistence, other.to_string()),
        })?;

        Ok(row.id)
    }

    /// Best-effort: persist the error descriptor as an analysis record so
    /// the failure stays visible in the strain's history. If this write
    /// fails it is only logged; the job's FAILED state stands either way.
    fn record_failure(&self, job: &Job, kind: ErrorKind, message: &str) {
        let payload = AnalysisPayload::Error(ErrorPayload {
            error_kind: kind.as_str().to_string(),
            error_message: message.to_string(),
            analysis_type: job.format.as_str().to_string(),
            bucket: job.locator.bucket.clone(),
            key: job.locator.key.clone(),
            strain_id: job.strain_id,
        });

        let results = match serde_json::to_value(&payload) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Could not serialize error record for job {}: {}", job.id, e);
                return;
            }
        };
        let file_url = job.locator.to_url(&self.endpoint);

        if let Err(e) = analysis_repo::create(
            &self.db,
            ERROR_ANALYSIS_TYPE,
            &results,
            job.strain_id,
            job.owner_id,
            Some(&file_url),
        ) {
            log::warn!("Could not record failure of job {}: {}", job.id, e);
        }
    }
}
