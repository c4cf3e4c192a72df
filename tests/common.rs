//! tests/common.rs
//! Shared helper functions for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use docket::{Docket, JobHandler, JobRecord, MemoryStore};

// Initializes tracing subscriber for test output.
pub fn setup_tracing() {
  // Use try_init to avoid panic if called multiple times
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_test_writer()
    .try_init();
}

// Builds an engine backed by the given in-memory store.
pub fn build_docket(store: Arc<MemoryStore>) -> Docket {
  Docket::builder()
    .store(store)
    .build()
    .expect("Failed to build docket")
}

// A handler that counts its invocations.
pub fn counting_handler(counter: Arc<AtomicUsize>) -> JobHandler {
  Arc::new(move |record: &JobRecord| {
    let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!(name = %record.name, count, "Counting handler fired.");
  })
}
