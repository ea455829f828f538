//! Object store client: fetches uploaded file bytes by (bucket, key).
//!
//! The pipeline consumes objects as incremental streams so large genomic
//! files never have to be fully buffered. Fetching is read-only and
//! uncached; every job re-fetches its object.

pub mod filesystem;
pub mod http;

use std::io::Read;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransportError;

pub use filesystem::FsObjectStore;
pub use http::HttpObjectStore;

/// A (bucket, key) pair identifying one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub bucket: String,
    pub key: String,
}

impl Locator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Generates the storage key for a fresh upload:
    /// `uploads/{uuid}-{original_filename}`.
    pub fn upload_key(original_filename: &str) -> String {
        format!("uploads/{}-{}", Uuid::new_v4(), original_filename)
    }

    /// The display filename: the last key segment, with the upload UUID
    /// prefix stripped when present.
    pub fn filename(&self) -> &str {
        let segment = self.key.rsplit('/').next().unwrap_or(&self.key);
        if let (Some(prefix), Some(rest)) = (segment.get(..36), segment.get(37..)) {
            if segment.as_bytes().get(36) == Some(&b'-') && Uuid::parse_str(prefix).is_ok() {
                return rest;
            }
        }
        segment
    }

    /// The file-URL convention: `{endpoint}/{bucket}/{key}`.
    pub fn to_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            self.bucket,
            self.key
        )
    }

    /// Parses a file URL back into a locator, given the endpoint it was
    /// built against. Inverse of [`Locator::to_url`].
    pub fn from_url(url: &str, endpoint: &str) -> Option<Self> {
        let rest = url
            .strip_prefix(endpoint.trim_end_matches('/'))?
            .strip_prefix('/')?;
        let (bucket, key) = rest.split_once('/')?;
        if bucket.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(bucket, key))
    }
}

/// Read access to named byte streams. `fetch` is the pipeline's only use;
/// `put` exists for the upload boundary and for seeding test stores.
pub trait ObjectStore: Send + Sync {
    /// Opens the object as an incremental byte stream.
    fn fetch(&self, locator: &Locator) -> Result<Box<dyn Read + Send>, TransportError>;

    /// Stores raw bytes under the locator, replacing any existing object.
    fn put(&self, locator: &Locator, bytes: &[u8]) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_round_trip() {
        let locator = Locator::new("biodata", "uploads/abc-reads.fasta");
        let url = locator.to_url("http://localhost:9000");
        assert_eq!(url, "http://localhost:9000/biodata/uploads/abc-reads.fasta");
        assert_eq!(
            Locator::from_url(&url, "http://localhost:9000/"),
            Some(locator)
        );
    }

    #[test]
    fn test_from_url_rejects_foreign_endpoint() {
        assert_eq!(
            Locator::from_url("http://other:9000/bucket/key", "http://localhost:9000"),
            None
        );
    }

    #[test]
    fn test_upload_key_shape() {
        let key = Locator::upload_key("reads.fasta");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-reads.fasta"));
        let uuid_part = &key["uploads/".len()..key.len() - "-reads.fasta".len()];
        assert!(Uuid::parse_str(uuid_part).is_ok());
    }

    #[test]
    fn test_filename_strips_upload_uuid() {
        let key = Locator::upload_key("reads.fasta");
        let locator = Locator::new("b", key);
        assert_eq!(locator.filename(), "reads.fasta");
    }

    #[test]
    fn test_filename_plain_key() {
        let locator = Locator::new("b", "data/reads.fasta");
        assert_eq!(locator.filename(), "reads.fasta");
    }
}
