use crate::error::StoreError;
use crate::job::{JobId, JobRecord};

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

/// The durable storage contract consumed by the engine.
///
/// Implementations sit in front of a document store keyed by unique job
/// name. The engine is the sole caller; it performs no retries, so an
/// adapter failure surfaces directly through the public API (or the log,
/// for firings and startup reconciliation).
#[async_trait]
pub trait JobStore: Send + Sync {
  /// Looks up a record by its unique name.
  async fn find_by_name(&self, name: &str) -> Result<Option<JobRecord>, StoreError>;

  /// Looks up a record by its durable identifier.
  async fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, StoreError>;

  /// Returns every stored job record. Used once, at startup reconciliation.
  async fn find_all(&self) -> Result<Vec<JobRecord>, StoreError>;

  /// Persists a new record, failing with [`StoreError::DuplicateName`] if a
  /// record with the same name already exists.
  async fn insert(&self, record: JobRecord) -> Result<JobRecord, StoreError>;

  /// Deletes a record. Removing an already-absent record is not an error.
  async fn remove(&self, record: &JobRecord) -> Result<(), StoreError>;
}

/// An in-process [`JobStore`] backed by a `HashMap`.
///
/// Provides no durability across restarts; intended for tests, examples,
/// and as a reference for real document-store adapters.
#[derive(Debug, Default)]
pub struct MemoryStore {
  records: Mutex<HashMap<JobId, JobRecord>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl JobStore for MemoryStore {
  async fn find_by_name(&self, name: &str) -> Result<Option<JobRecord>, StoreError> {
    let records = self.records.lock();
    Ok(records.values().find(|r| r.name == name).cloned())
  }

  async fn find_by_id(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
    Ok(self.records.lock().get(&id).cloned())
  }

  async fn find_all(&self) -> Result<Vec<JobRecord>, StoreError> {
    Ok(self.records.lock().values().cloned().collect())
  }

  async fn insert(&self, record: JobRecord) -> Result<JobRecord, StoreError> {
    let mut records = self.records.lock();
    if records.values().any(|r| r.name == record.name) {
      return Err(StoreError::DuplicateName(record.name));
    }
    records.insert(record.id, record.clone());
    Ok(record)
  }

  async fn remove(&self, record: &JobRecord) -> Result<(), StoreError> {
    self.records.lock().remove(&record.id);
    Ok(())
  }
}
