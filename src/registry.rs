use crate::job::JobHandler;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Maps job name to its ordered list of handlers.
///
/// Handler lifecycle is independent of job records: handlers can be
/// registered before a job exists and survive its completion. Nothing here
/// is persisted.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
  handlers: Mutex<HashMap<String, Vec<JobHandler>>>,
}

impl HandlerRegistry {
  /// Appends `handler` to the list for `name`, creating the list if absent.
  pub fn add(&self, name: &str, handler: JobHandler) {
    debug!(name, "Adding job handler.");
    self
      .handlers
      .lock()
      .entry(name.to_string())
      .or_default()
      .push(handler);
  }

  /// Removes the first entry that is the same `Arc` as `handler`.
  /// No-op when the name or handler is unknown.
  pub fn remove(&self, name: &str, handler: &JobHandler) {
    debug!(name, "Removing job handler.");
    let mut handlers = self.handlers.lock();
    if let Some(list) = handlers.get_mut(name) {
      if let Some(pos) = list.iter().position(|h| Arc::ptr_eq(h, handler)) {
        list.remove(pos);
      }
    }
  }

  /// Snapshot of the handlers registered for `name`, in registration order.
  pub fn handlers_for(&self, name: &str) -> Vec<JobHandler> {
    self.handlers.lock().get(name).cloned().unwrap_or_default()
  }
}
