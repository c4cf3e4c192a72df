//! tests/create.rs
//! Creation semantics: persistence, idempotency, and restart rescheduling.

mod common;

use crate::common::{build_docket, counting_handler, setup_tracing};
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use docket::{DueSpec, JobOptions, JobStore, MemoryStore, RECORD_KIND};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[tokio::test]
async fn create_persists_a_record_with_the_requested_due() -> Result<()> {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store.clone());

  let due = Utc::now() + ChronoDuration::seconds(30);
  let record = docket.create_job("report", JobOptions::at(due)).await?;

  assert_eq!(record.name, "report");
  assert_eq!(record.due, DueSpec::At(due));
  assert_eq!(record.kind, RECORD_KIND);
  assert!(record.remove_on_complete);

  let stored = store.find_all().await?;
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0], record);
  Ok(())
}

#[tokio::test]
async fn create_is_idempotent_and_installs_no_second_timer() -> Result<()> {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store.clone());
  let fired = Arc::new(AtomicUsize::new(0));
  docket.add_job_handler("once", counting_handler(fired.clone()));

  let first = docket
    .create_job("once", JobOptions::at(Utc::now() + ChronoDuration::milliseconds(300)))
    .await?;

  // Second create with different options: the existing record wins, no new
  // record and no new timer.
  let second = docket
    .create_job("once", JobOptions::at(Utc::now() + ChronoDuration::seconds(30)))
    .await?;

  assert_eq!(first.id, second.id);
  assert_eq!(first.due, second.due);
  assert_eq!(store.find_all().await?.len(), 1);

  tokio::time::sleep(StdDuration::from_millis(1200)).await;
  assert_eq!(fired.load(Ordering::SeqCst), 1, "exactly one firing expected");
  Ok(())
}

#[tokio::test]
async fn restart_resets_the_timer_without_duplicate_firings() -> Result<()> {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store.clone());
  let fired = Arc::new(AtomicUsize::new(0));
  docket.add_job_handler("restartable", counting_handler(fired.clone()));

  let original = docket
    .create_job(
      "restartable",
      JobOptions::at(Utc::now() + ChronoDuration::milliseconds(500)),
    )
    .await?;

  tokio::time::sleep(StdDuration::from_millis(200)).await;

  // Restart cancels the live timer and installs exactly one new one for the
  // stored due spec. The stored record is unchanged.
  let restarted = docket
    .create_job("restartable", JobOptions::default().restart())
    .await?;
  assert_eq!(restarted.id, original.id);
  assert_eq!(restarted.due, original.due);

  tokio::time::sleep(StdDuration::from_millis(1200)).await;
  assert_eq!(fired.load(Ordering::SeqCst), 1, "no duplicate firings after restart");
  Ok(())
}

#[tokio::test]
async fn default_due_is_one_minute_out() -> Result<()> {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let docket = build_docket(store.clone());

  let before = Utc::now();
  let record = docket.create_job("defaulted", JobOptions::default()).await?;

  match record.due {
    DueSpec::At(at) => {
      let delta = at - before;
      assert!(delta >= ChronoDuration::seconds(59));
      assert!(delta <= ChronoDuration::seconds(61));
    }
    DueSpec::Every(_) => panic!("default due should be one-shot"),
  }
  Ok(())
}
