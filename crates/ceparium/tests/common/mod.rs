//! Test harness for isolated end-to-end runs.
//!
//! Each `TestHarness` owns a temporary object store, a SQLite database on
//! disk, a running worker pool, and one organism/strain/user to attach
//! analyses to. Dropping the harness tears everything down.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use ceparium::db::{metadata_repo, Database};
use ceparium::dispatch::{Dispatcher, JobStatusResponse};
use ceparium::object_store::{FsObjectStore, Locator, ObjectStore};
use ceparium::parser::AnalysisFormat;
use ceparium::pipeline::AnalysisPipeline;
use ceparium::worker::WorkerPool;

pub const ENDPOINT: &str = "http://localhost:9000";
pub const BUCKET: &str = "biodata";

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub store: FsObjectStore,
    pub dispatcher: Dispatcher,
    pub strain_id: i64,
    pub owner_id: i64,
}

impl TestHarness {
    pub fn new(worker_count: usize) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db = Database::open(&temp_dir.path().join("ceparium.db")).expect("open database");

        let organism = metadata_repo::create_organism(&db, "E. coli K-12", "Escherichia", "coli")
            .expect("create organism");
        let strain =
            metadata_repo::create_strain(&db, "MG1655", Some("ATCC 700926"), organism.id)
                .expect("create strain");
        let user =
            metadata_repo::create_user(&db, "tests@example.org", Some("Test User"))
                .expect("create user");

        let store_root = temp_dir.path().join("store");
        let store = FsObjectStore::new(&store_root);
        let pipeline = AnalysisPipeline::new(
            db.clone(),
            Arc::new(FsObjectStore::new(&store_root)),
            ENDPOINT,
        );
        let pool = Arc::new(WorkerPool::new(Arc::new(pipeline), worker_count));
        let dispatcher = Dispatcher::new(db.clone(), pool);

        Self {
            temp_dir,
            db,
            store,
            dispatcher,
            strain_id: strain.id,
            owner_id: user.id,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.temp_dir.path().join("ceparium.db")
    }

    /// Stores a file and returns its locator.
    pub fn put_object(&self, key: &str, content: &[u8]) -> Locator {
        let locator = Locator::new(BUCKET, key);
        self.store.put(&locator, content).expect("store object");
        locator
    }

    /// Submits a job for a file the harness has already stored.
    pub fn submit(&self, format: AnalysisFormat, key: &str) -> String {
        self.dispatcher
            .submit(
                format,
                Locator::new(BUCKET, key),
                self.strain_id,
                self.owner_id,
            )
            .expect("submit job")
    }

    /// Polls the job's status until it reaches a terminal state.
    pub fn wait_terminal(&self, job_id: &str) -> JobStatusResponse {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let status = self.dispatcher.status(job_id).expect("job status");
            match status {
                JobStatusResponse::Succeeded { .. } | JobStatusResponse::Failed { .. } => {
                    return status
                }
                _ if Instant::now() > deadline => {
                    panic!("job {job_id} did not finish in time, last status {status:?}")
                }
                _ => std::thread::sleep(Duration::from_millis(20)),
            }
        }
    }
}
