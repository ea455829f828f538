//! Filesystem-backed object store for development and tests.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::TransportError;
use crate::object_store::{Locator, ObjectStore};

/// Lays objects out as `root/{bucket}/{key}` on local disk.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn object_path(&self, locator: &Locator) -> PathBuf {
        self.root.join(&locator.bucket).join(&locator.key)
    }
}

impl ObjectStore for FsObjectStore {
    fn fetch(&self, locator: &Locator) -> Result<Box<dyn Read + Send>, TransportError> {
        let path = self.object_path(locator);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TransportError::NotFound {
                    bucket: locator.bucket.clone(),
                    key: locator.key.clone(),
                })
            }
            Err(e) => Err(TransportError::Read {
                bucket: locator.bucket.clone(),
                key: locator.key.clone(),
                source: e,
            }),
        }
    }

    fn put(&self, locator: &Locator, bytes: &[u8]) -> Result<(), TransportError> {
        let path = self.object_path(locator);
        let write_err = |e: std::io::Error| TransportError::Write {
            bucket: locator.bucket.clone(),
            key: locator.key.clone(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(&path, bytes).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_fetch() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let locator = Locator::new("biodata", "uploads/x-reads.fasta");

        store.put(&locator, b">seq1\nACGT\n").unwrap();

        let mut contents = String::new();
        store
            .fetch(&locator)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, ">seq1\nACGT\n");
    }

    #[test]
    fn test_fetch_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let err = store
            .fetch(&Locator::new("biodata", "missing.fasta"))
            .err()
            .unwrap();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsObjectStore::new(dir.path());
        let locator = Locator::new("b", "k");

        store.put(&locator, b"first").unwrap();
        store.put(&locator, b"second").unwrap();

        let mut contents = String::new();
        store
            .fetch(&locator)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "second");
    }
}
