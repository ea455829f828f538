use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::AnalysisPipeline;
use crate::worker::job::{Job, JobResult};

/// Fixed pool of worker threads pulling jobs from one shared FIFO channel.
///
/// Submission never blocks on execution: the job channel is unbounded and
/// the caller returns as soon as the job is enqueued. Each job is delivered
/// to exactly one worker; the persisted job row additionally refuses a
/// second claim should delivery ever be duplicated.
pub struct WorkerPool {
    job_sender: Sender<Job>,
    result_receiver: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `worker_count` workers executing jobs through `pipeline`.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(pipeline: Arc<AnalysisPipeline>, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = unbounded::<Job>();
        let (result_sender, result_receiver) = unbounded::<JobResult>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, result_tx, shutdown_flag, worker_pipeline);
            });

            workers.push(handle);
        }

        info!("Started {} analysis workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    /// Enqueues a job. Returns immediately; execution happens on a worker.
    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    /// Blocks until the next job result arrives (or the pool is gone).
    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Waits for all workers to finish. Call after `shutdown`.
    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    result_sender: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<AnalysisPipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} processing job {}", worker_id, job.id);
                let job_id = job.id.clone();

                // `None` means the claim was refused; another worker owns
                // the job and will report it.
                let Some(outcome) = pipeline.execute(&job) else {
                    continue;
                };

                if let Err(e) = result_sender.send(JobResult { job_id, outcome }) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{job_repo, metadata_repo, Database};
    use crate::object_store::{FsObjectStore, Locator, ObjectStore};
    use crate::parser::AnalysisFormat;
    use crate::worker::job::JobOutcome;
    use tempfile::TempDir;

    fn test_pipeline(dir: &TempDir) -> (Database, Arc<AnalysisPipeline>, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let organism = metadata_repo::create_organism(&db, "E. coli", "Escherichia", "coli").unwrap();
        let strain = metadata_repo::create_strain(&db, "MG1655", None, organism.id).unwrap();
        let user = metadata_repo::create_user(&db, "lab@example.org", None).unwrap();

        let store = Arc::new(FsObjectStore::new(dir.path()));
        let pipeline = Arc::new(AnalysisPipeline::new(
            db.clone(),
            store,
            "http://localhost:9000",
        ));
        (db, pipeline, strain.id, user.id)
    }

    #[test]
    fn test_worker_pool_creation_and_shutdown() {
        let dir = TempDir::new().unwrap();
        let (_db, pipeline, _, _) = test_pipeline(&dir);
        let pool = WorkerPool::new(pipeline, 2);

        assert!(!pool.is_shutdown());
        pool.shutdown();
        assert!(pool.is_shutdown());
        pool.wait();
    }

    #[test]
    fn test_submit_and_process_fasta_job() {
        let dir = TempDir::new().unwrap();
        let (db, pipeline, strain_id, owner_id) = test_pipeline(&dir);

        let store = FsObjectStore::new(dir.path());
        let locator = Locator::new("biodata", "uploads/reads.fasta");
        store.put(&locator, b">s1\nACGT\n>s2\nGGCC\n").unwrap();

        let pool = WorkerPool::new(pipeline, 2);
        let job = Job::new(AnalysisFormat::FastaCount, locator, strain_id, owner_id);
        job_repo::insert_pending(&db, &job).unwrap();
        pool.submit(job.clone()).unwrap();

        let result = pool.recv_result().unwrap();
        assert_eq!(result.job_id, job.id);
        assert!(matches!(result.outcome, JobOutcome::Succeeded { .. }));

        pool.shutdown();
        pool.wait();
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let dir = TempDir::new().unwrap();
        let (_db, pipeline, strain_id, owner_id) = test_pipeline(&dir);
        let pool = WorkerPool::new(pipeline, 1);
        pool.shutdown();

        let job = Job::new(
            AnalysisFormat::FastaCount,
            Locator::new("b", "k"),
            strain_id,
            owner_id,
        );
        assert!(pool.submit(job).is_err());
        pool.wait();
    }
}
