//! Standalone analysis worker daemon.
//!
//! Polls the job table for PENDING work, feeds it to the worker pool, and
//! drains results. Because jobs are claimed through the persisted job row,
//! work left over from a previous process run is picked up on startup.

use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ceparium::db::{job_repo, Database};
use ceparium::pipeline::AnalysisPipeline;
use ceparium::worker::WorkerPool;
use ceparium::{HttpObjectStore, Settings};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn init_logging() {
    // Route `log` macro output through tracing so spans and events share
    // one subscriber.
    let _ = tracing_log::LogTracer::init();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn main() -> ExitCode {
    init_logging();
    info!("Starting ceparium worker v{}", env!("CARGO_PKG_VERSION"));

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db = match Database::open(&settings.database_path) {
        Ok(db) => db,
        Err(e) => {
            error!(
                "Failed to open database at {}: {}",
                settings.database_path.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let store = Arc::new(HttpObjectStore::new(&settings.store_endpoint));
    let pipeline = Arc::new(AnalysisPipeline::new(
        db.clone(),
        store,
        settings.store_endpoint.clone(),
    ));
    let pool = WorkerPool::new(pipeline, settings.worker_count);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Shutdown requested");
            stop.store(true, Ordering::SeqCst);
        }) {
            warn!("Could not install signal handler: {}", e);
        }
    }

    if let Err(e) = run(&db, &pool, &stop) {
        error!("Worker loop aborted: {}", e);
    }

    info!("Draining workers");
    pool.shutdown();
    pool.wait();
    info!("Worker stopped");
    ExitCode::SUCCESS
}

fn run(
    db: &Database,
    pool: &WorkerPool,
    stop: &AtomicBool,
) -> Result<(), ceparium::CepariumError> {
    // Ids handed to the pool but not yet reported back. Keeps the poll
    // loop from re-submitting a job that is still PENDING in the table
    // only because no worker has claimed it yet.
    let mut in_flight: HashSet<String> = HashSet::new();

    while !stop.load(Ordering::SeqCst) {
        for row in job_repo::list_pending(db)? {
            if in_flight.contains(&row.id) {
                continue;
            }
            let Some(job) = row.to_job() else {
                warn!("Skipping undecodable job row {}", row.id);
                continue;
            };
            let id = job.id.clone();
            pool.submit(job)?;
            in_flight.insert(id);
        }

        while let Some(result) = pool.try_recv_result() {
            in_flight.remove(&result.job_id);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}
