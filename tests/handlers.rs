//! tests/handlers.rs
//! Handler registry behavior: ordering, identity removal, and tolerance of
//! jobs firing without handlers.

mod common;

use crate::common::{build_docket, counting_handler, setup_tracing};
use chrono::{Duration as ChronoDuration, Utc};
use docket::{JobHandler, JobOptions, JobRecord, JobStore, MemoryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

#[tokio::test]
async fn handlers_fire_in_registration_order() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store);

  let order = Arc::new(Mutex::new(Vec::<u8>::new()));
  for tag in [1u8, 2, 3] {
    let order = order.clone();
    docket.add_job_handler(
      "ordered",
      Arc::new(move |_: &JobRecord| order.lock().unwrap().push(tag)),
    );
  }

  docket
    .create_job("ordered", JobOptions::at(Utc::now() + ChronoDuration::milliseconds(100)))
    .await
    .unwrap();

  tokio::time::sleep(StdDuration::from_millis(600)).await;
  assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn removing_one_handler_leaves_the_others() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store);

  let first_count = Arc::new(AtomicUsize::new(0));
  let second_count = Arc::new(AtomicUsize::new(0));
  let first: JobHandler = counting_handler(first_count.clone());
  let second: JobHandler = counting_handler(second_count.clone());

  docket.add_job_handler("partial", first.clone());
  docket.add_job_handler("partial", second.clone());
  docket.remove_job_handler("partial", &first);

  docket
    .create_job("partial", JobOptions::at(Utc::now() + ChronoDuration::milliseconds(100)))
    .await
    .unwrap();

  tokio::time::sleep(StdDuration::from_millis(600)).await;
  assert_eq!(first_count.load(Ordering::SeqCst), 0, "removed handler fired");
  assert_eq!(second_count.load(Ordering::SeqCst), 1, "remaining handler skipped");
}

#[tokio::test]
async fn handlers_registered_before_the_job_exists_still_fire() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store);

  let fired = Arc::new(AtomicUsize::new(0));
  // Registered first; the job comes later.
  docket.add_job_handler("eager", counting_handler(fired.clone()));

  docket
    .create_job("eager", JobOptions::at(Utc::now() + ChronoDuration::milliseconds(100)))
    .await
    .unwrap();

  tokio::time::sleep(StdDuration::from_millis(600)).await;
  assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn firing_without_handlers_still_honors_remove_on_complete() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store.clone());

  docket
    .create_job("unheard", JobOptions::at(Utc::now() + ChronoDuration::milliseconds(100)))
    .await
    .unwrap();

  tokio::time::sleep(StdDuration::from_millis(600)).await;
  assert!(
    store.find_all().await.unwrap().is_empty(),
    "firing with zero handlers should still complete the job"
  );
}
