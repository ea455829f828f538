use thiserror::Error;

use crate::parser::UnknownFormat;

#[derive(Error, Debug)]
pub enum CepariumError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Object store error: {0}")]
    Transport(#[from] TransportError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Upload rejected: {0}")]
    Intake(#[from] IntakeError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable '{0}'")]
    MissingVar(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Errors from the object store client. `NotFound` is distinguished so the
/// pipeline can report a missing object differently from a connectivity
/// failure.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Failed to read object '{bucket}/{key}': {source}")]
    Read {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write object '{bucket}/{key}': {source}")]
    Write {
        bucket: String,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request to '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected status {status} for '{url}'")]
    Status { url: String, status: u16 },
}

/// Errors from the format parsers. Parsers never perform I/O beyond the
/// reader they are handed, so everything here describes the input itself
/// (plus `Read` for failures of the underlying stream).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File contains no {0}")]
    Empty(&'static str),

    #[error("Malformed {format} input at record {record}: {reason}")]
    Malformed {
        format: &'static str,
        record: usize,
        reason: String,
    },

    #[error("Feature tree exceeds maximum depth of {0}")]
    FeatureDepthExceeded(usize),

    #[error("Failed to read input: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

/// Synchronous submission/status errors. These surface to the caller before
/// a job ever enters the queue; nothing here is a job outcome.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Strain {0} does not exist")]
    UnknownStrain(i64),

    #[error("Unknown job id: {0}")]
    UnknownJob(String),

    #[error(transparent)]
    InvalidFormat(#[from] UnknownFormat),

    #[error("Job queue unavailable: {0}")]
    Queue(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

/// Upload intake validation errors, checked before bytes reach the store.
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Uploaded file has no name")]
    MissingFilename,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File too large ({size} bytes, maximum {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("File extension '{0}' is not an accepted bioinformatics format")]
    DisallowedExtension(String),

    #[error("File extension '{extension}' is not valid for {format} analysis")]
    WrongExtension { extension: String, format: String },
}

pub type Result<T> = std::result::Result<T, CepariumError>;
