//! Docket: a persisted, named-job scheduler for Tokio.
//!
//! Callers register named jobs with a due time, one-shot or recurring,
//! and handlers keyed by job name. The engine guarantees each named job
//! fires its registered handlers at the right time, survives process
//! restarts by reloading pending jobs from durable storage, and enforces
//! at-most-one active schedule per job name.
//!
//! # Features
//!
//! - One-shot jobs due at an absolute [`DateTime<Utc>`](chrono::DateTime),
//!   and recurring jobs following a [`RecurrenceRule`] (per-second up to
//!   per-year patterns, node-style "every value" wildcards).
//! - Durable job records behind the [`JobStore`] trait: bring any document
//!   store that can find/insert/remove by name and id. [`MemoryStore`] is
//!   the in-process reference adapter.
//! - Startup reconciliation: constructing the engine re-installs a timer
//!   for every stored record, so pending jobs survive restarts. Past-due
//!   records fire immediately.
//! - Idempotent creates (at most one record and one timer per name), with
//!   an opt-in `restart` to reset an existing job's timer.
//! - Race-safe removal: a timer firing concurrently with `remove_job` is
//!   suppressed by a per-name cancellation window.
//! - Pluggable timer primitive via the [`Timer`] trait; [`TokioTimer`] is
//!   the default.
//!
//! # Usage
//!
//! ```no_run
//! use docket::{Docket, JobOptions, JobRecord, MemoryStore, RecurrenceRule};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let docket = Docket::builder()
//!         .store(Arc::new(MemoryStore::new()))
//!         .build()?;
//!
//!     // Handlers are keyed by job name and run in registration order.
//!     docket.add_job_handler(
//!         "nightly-report",
//!         Arc::new(|record: &JobRecord| {
//!             println!("firing {} with payload {}", record.name, record.data);
//!         }),
//!     );
//!
//!     // A recurring job, fired every day at 07:30 UTC. The record is
//!     // persisted, so a restarted process picks it up again.
//!     docket
//!         .create_job(
//!             "nightly-report",
//!             JobOptions::every(RecurrenceRule::daily_at(7, 30)).keep_after_complete(),
//!         )
//!         .await?;
//!
//!     // ... later: cancel the timer and delete the record.
//!     docket.remove_job("nightly-report").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Semantics worth knowing
//!
//! - The durable store is re-read on every firing (consistency over
//!   latency): concurrent edits are observed, and a record removed out from
//!   under a timer turns the firing into a no-op.
//! - Handlers run synchronously on the firing task; panics are not caught
//!   and jobs are not retried.
//! - `remove_on_complete` defaults to `true`. For a recurring job this
//!   deletes the durable record after the *first* firing while the live
//!   timer keeps firing in-process until `remove_job`; a restarted process
//!   will not resurrect it. Pass
//!   [`JobOptions::keep_after_complete`](crate::JobOptions::keep_after_complete)
//!   for a recurring job that should survive restarts.
//! - A crash between firing and removal can skip or rerun a job; docket
//!   provides at-most-once attempts, not exactly-once delivery.

pub mod error;
pub mod job;
mod registry;
pub mod rule;
pub mod scheduler;
pub mod store;
pub mod timer;

// --- Public Re-exports ---

// Engine
pub use scheduler::{Docket, DocketBuilder};

// Error types
pub use error::{BuildError, SchedulerError, StoreError};

// Job related types
pub use job::{JobHandler, JobId, JobOptions, JobRecord, RECORD_KIND};

// Due specs
pub use rule::{DueSpec, RecurrenceRule};

// Collaborator contracts and default implementations
pub use store::{JobStore, MemoryStore};
pub use timer::{BoxedFireFn, Timer, TimerHandle, TokioTimer};
