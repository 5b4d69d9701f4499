//! Capped diagnostics log of failed requests
//!
//! Entries are kept newest first as a JSON array under
//! [`storage_keys::ERROR_LOG`]. Recording is best effort: a storage failure
//! is logged and otherwise ignored so it can never mask the request error.

use std::sync::Arc;

use backoffice_core::KeyValueStore;
use backoffice_domain::constants::{storage_keys, ERROR_LOG_CAPACITY};
use backoffice_domain::{ApiError, ErrorLogEntry, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Handle to the persisted error log; clones share the same lock
#[derive(Clone)]
pub struct ErrorLog {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for ErrorLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorLog").field("capacity", &self.capacity).finish_non_exhaustive()
    }
}

impl ErrorLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, ERROR_LOG_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self { store, capacity: capacity.max(1), lock: Arc::new(Mutex::new(())) }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries currently stored, newest first
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or holds invalid data.
    pub fn entries(&self) -> Result<Vec<ErrorLogEntry>> {
        match self.store.get(storage_keys::ERROR_LOG)? {
            Some(raw) => {
                serde_json::from_str(&raw).map_err(|e| ApiError::from(InfraError::from(e)))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Insert `entry` at the front and drop the oldest entries over capacity.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read or written.
    pub fn append(&self, entry: ErrorLogEntry) -> Result<()> {
        let _guard = self.lock.lock();

        let mut entries = match self.entries() {
            Ok(entries) => entries,
            Err(ApiError::Serialization(reason)) => {
                warn!(%reason, "error log was unreadable, starting a new one");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        entries.insert(0, entry);
        entries.truncate(self.capacity);

        let raw =
            serde_json::to_string(&entries).map_err(|e| ApiError::from(InfraError::from(e)))?;
        self.store.set(storage_keys::ERROR_LOG, &raw)
    }

    /// Append without surfacing failures
    pub fn record(&self, entry: ErrorLogEntry) {
        if let Err(err) = self.append(entry) {
            debug!(error = %err, "failed to record API error");
        }
    }

    /// Remove every entry
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock();
        self.store.remove(storage_keys::ERROR_LOG)
    }
}
