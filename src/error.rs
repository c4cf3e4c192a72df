use thiserror::Error;

/// Errors that can occur while constructing a [`Docket`](crate::Docket)
/// via [`DocketBuilder`](crate::DocketBuilder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
  /// A durable store must be provided; the engine cannot operate without one.
  #[error("A job store must be provided via `DocketBuilder::store`")]
  MissingStore,
}

/// Errors produced by [`JobStore`](crate::store::JobStore) implementations.
///
/// Adapters wrap backend/driver failures in [`StoreError::Backend`]; the
/// structured variant lets the engine and callers distinguish an expected
/// condition (duplicate names) from genuine I/O failures. Absent records
/// are not errors: lookups return `Ok(None)` and removes succeed quietly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  /// A record with this name already exists. Job names are unique.
  #[error("A job named {0:?} already exists")]
  DuplicateName(String),
  /// The storage backend failed (connection loss, query error, ...).
  #[error("Storage backend error: {0}")]
  Backend(String),
}

/// Errors returned by the public [`Docket`](crate::Docket) operations.
///
/// Handler panics are deliberately *not* represented here: the engine does
/// not catch them, they propagate to the firing task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
  /// A storage operation failed during create/remove. The engine's
  /// in-memory state is left consistent.
  #[error(transparent)]
  Storage(#[from] StoreError),
}
