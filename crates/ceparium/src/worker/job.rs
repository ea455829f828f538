use chrono::{DateTime, Utc};

use crate::object_store::Locator;
use crate::parser::AnalysisFormat;

/// A queued unit of asynchronous parse work.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique job identifier (UUID), assigned at submission.
    pub id: String,
    /// Which analysis to run.
    pub format: AnalysisFormat,
    /// Where the uploaded bytes live.
    pub locator: Locator,
    /// Display filename, derived from the storage key.
    pub filename: String,
    /// Strain this analysis belongs to.
    pub strain_id: i64,
    /// User who requested the analysis.
    pub owner_id: i64,
    pub submitted_at: DateTime<Utc>,
}

impl Job {
    pub fn new(format: AnalysisFormat, locator: Locator, strain_id: i64, owner_id: i64) -> Self {
        let filename = locator.filename().to_string();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            format,
            locator,
            filename,
            strain_id,
            owner_id,
            submitted_at: Utc::now(),
        }
    }
}

/// Which stage of job execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Object store fetch failed (missing object or connectivity).
    Transport,
    /// File content was malformed or semantically empty.
    Parse,
    /// The result could not be recorded after a successful parse.
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Parse => "parse",
            ErrorKind::Persistence => "persistence",
        }
    }
}

/// Terminal outcome of one job execution.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { result_id: i64 },
    Failed { kind: ErrorKind, message: String },
}

/// What a worker reports back after executing a job.
#[derive(Debug)]
pub struct JobResult {
    pub job_id: String,
    pub outcome: JobOutcome,
}
