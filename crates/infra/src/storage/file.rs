//! File-backed key-value store
//!
//! All keys live in one JSON object inside the storage directory. Writes
//! go to a temporary file in the same directory which is then renamed over
//! the document, so readers never observe a half-written file.
//!
//! Every call does blocking file I/O. Async callers in this crate reach it
//! through `spawn_blocking`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use backoffice_core::KeyValueStore;
use backoffice_domain::{ApiError, Result};
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::InfraError;

const STORE_FILE: &str = "storage.json";

type Document = BTreeMap<String, String>;

/// Store that survives process restarts
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (or create) the store in `dir`.
    ///
    /// # Errors
    /// Returns `ApiError::Storage` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ApiError::from(InfraError::from(e)))?;
        let path = dir.join(STORE_FILE);
        debug!(path = %path.display(), "opened file store");
        Ok(Self { dir, path, write_lock: Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(InfraError::from(e).into()),
        };

        if contents.trim().is_empty() {
            return Ok(Document::new());
        }

        serde_json::from_str(&contents).map_err(|e| ApiError::from(InfraError::from(e)))
    }

    /// Read the document for modification; a corrupt file starts over empty.
    fn read_for_update(&self) -> Result<Document> {
        match self.read_document() {
            Err(ApiError::Serialization(reason)) => {
                warn!(path = %self.path.display(), %reason, "discarding unreadable store file");
                Ok(Document::new())
            }
            other => other,
        }
    }

    fn write_document(&self, document: &Document) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(document).map_err(|e| ApiError::from(InfraError::from(e)))?;

        let mut tmp =
            NamedTempFile::new_in(&self.dir).map_err(|e| ApiError::from(InfraError::from(e)))?;
        tmp.write_all(&json).map_err(|e| ApiError::from(InfraError::from(e)))?;
        tmp.persist(&self.path).map_err(|e| ApiError::from(InfraError::from(e.error)))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut document = self.read_for_update()?;
        apply(&mut document);
        self.write_document(&document)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|document| {
            document.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|document| {
            document.remove(key);
        })
    }
}
