pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod intake;
pub mod object_store;
pub mod parser;
pub mod pipeline;
pub mod worker;

pub use config::Settings;
pub use dispatch::{Dispatcher, JobStatusResponse};
pub use error::{
    CepariumError, ConfigError, DispatchError, IntakeError, ParseError, Result, TransportError,
    WorkerError,
};
pub use object_store::{FsObjectStore, HttpObjectStore, Locator, ObjectStore};
pub use parser::{AnalysisFormat, AnalysisPayload};
pub use pipeline::AnalysisPipeline;
pub use worker::{ErrorKind, Job, JobOutcome, JobResult, WorkerPool};
