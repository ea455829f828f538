//! Runtime settings, read once from the environment at startup.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::intake::DEFAULT_MAX_UPLOAD_BYTES;

const ENV_DATABASE_PATH: &str = "CEPARIUM_DATABASE_PATH";
const ENV_STORE_ENDPOINT: &str = "CEPARIUM_STORE_ENDPOINT";
const ENV_BUCKET: &str = "CEPARIUM_BUCKET";
const ENV_WORKERS: &str = "CEPARIUM_WORKERS";
const ENV_MAX_UPLOAD_BYTES: &str = "CEPARIUM_MAX_UPLOAD_BYTES";

const DEFAULT_BUCKET: &str = "ceparium";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub store_endpoint: String,
    pub bucket: String,
    pub worker_count: usize,
    pub max_upload_bytes: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any name -> value lookup. Tests pass a closure
    /// over a map instead of mutating the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let database_path = lookup(ENV_DATABASE_PATH)
            .ok_or(ConfigError::MissingVar(ENV_DATABASE_PATH))?
            .into();

        let store_endpoint = lookup(ENV_STORE_ENDPOINT)
            .ok_or(ConfigError::MissingVar(ENV_STORE_ENDPOINT))?
            .trim_end_matches('/')
            .to_string();

        let bucket = lookup(ENV_BUCKET).unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        let worker_count = match lookup(ENV_WORKERS) {
            Some(raw) => parse_var(ENV_WORKERS, &raw)?,
            None => num_cpus::get(),
        };
        if worker_count == 0 {
            return Err(ConfigError::InvalidVar {
                name: ENV_WORKERS,
                reason: "worker count must be at least 1".to_string(),
            });
        }

        let max_upload_bytes = match lookup(ENV_MAX_UPLOAD_BYTES) {
            Some(raw) => parse_var(ENV_MAX_UPLOAD_BYTES, &raw)?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            database_path,
            store_endpoint,
            bucket,
            worker_count,
            max_upload_bytes,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidVar {
        name,
        reason: e.to_string(),
    })
}
