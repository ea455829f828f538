pub mod job;
pub mod pool;

pub use job::{ErrorKind, Job, JobOutcome, JobResult};
pub use pool::WorkerPool;
