//! HTTP object store client.
//!
//! Speaks plain `GET`/`PUT` against `{endpoint}/{bucket}/{key}`, which is
//! how a MinIO/S3-compatible store is addressed in dev mode or through
//! presigned access. Request signing is deliberately not implemented here.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::error::TransportError;
use crate::object_store::{Locator, ObjectStore};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpObjectStore {
    client: Client,
    endpoint: String,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ObjectStore for HttpObjectStore {
    fn fetch(&self, locator: &Locator) -> Result<Box<dyn Read + Send>, TransportError> {
        let url = locator.to_url(&self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| TransportError::Http {
                url: url.clone(),
                source: e,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(TransportError::NotFound {
                bucket: locator.bucket.clone(),
                key: locator.key.clone(),
            }),
            status if !status.is_success() => Err(TransportError::Status {
                url,
                status: status.as_u16(),
            }),
            // The response body is the stream; it is read incrementally by
            // the parser and closed when dropped.
            _ => Ok(Box::new(response)),
        }
    }

    fn put(&self, locator: &Locator, bytes: &[u8]) -> Result<(), TransportError> {
        let url = locator.to_url(&self.endpoint);
        let response = self
            .client
            .put(&url)
            .body(bytes.to_vec())
            .send()
            .map_err(|e| TransportError::Http {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
