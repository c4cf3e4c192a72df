use crate::error::{BuildError, SchedulerError};
use crate::job::{JobHandler, JobOptions, JobRecord, RECORD_KIND};
use crate::registry::HandlerRegistry;
use crate::store::JobStore;
use crate::timer::{BoxedFireFn, Timer, TimerHandle, TokioTimer};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Builder for configuring and creating a [`Docket`] engine instance.
///
/// A durable [`JobStore`] is required; the timer primitive defaults to
/// [`TokioTimer`].
///
/// # Example
///
/// ```no_run
/// use docket::{Docket, MemoryStore};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let docket = Docket::builder()
///     .store(Arc::new(MemoryStore::new()))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DocketBuilder {
  store: Option<Arc<dyn JobStore>>,
  timer: Option<Arc<dyn Timer>>,
}

impl DocketBuilder {
  /// Creates a new builder with no store and the default timer.
  pub fn new() -> Self {
    Self::default()
  }

  /// Sets the durable store the engine persists job records to (required).
  pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
    self.store = Some(store);
    self
  }

  /// Overrides the timer primitive. Defaults to [`TokioTimer`].
  pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
    self.timer = Some(timer);
    self
  }

  /// Builds the engine and spawns the startup reconciliation task, which
  /// re-establishes one in-memory timer per durable record. A failed load
  /// is logged and the engine starts with an empty scheduling table.
  ///
  /// Must be called within a Tokio runtime.
  ///
  /// # Errors
  ///
  /// Returns [`BuildError::MissingStore`] if no store was provided.
  pub fn build(self) -> Result<Docket, BuildError> {
    let store = self.store.ok_or(BuildError::MissingStore)?;
    let timer = self.timer.unwrap_or_else(|| Arc::new(TokioTimer));

    let engine = Arc::new(Engine {
      store,
      timer,
      registry: HandlerRegistry::default(),
      table: Mutex::new(HashMap::new()),
    });

    let reconcile = engine.clone();
    Handle::current().spawn(async move {
      reconcile.reconcile().await;
    });

    Ok(Docket { engine })
  }
}

/// A persisted, named-job scheduler.
///
/// Callers register named jobs with a due time (one-shot or recurring) and
/// handlers keyed by job name. The engine persists each job to the
/// configured [`JobStore`], installs a live timer for it, and on every
/// firing re-reads the record from storage before invoking the handlers in
/// registration order. At most one schedule exists per job name.
///
/// Each instance owns its scheduling state; multiple engines (e.g. one per
/// storage connection) share nothing. Dropping the last handle to an
/// instance cancels all of its live timers; durable records are untouched.
///
/// Use [`Docket::builder()`] to create an instance.
pub struct Docket {
  engine: Arc<Engine>,
}

impl Docket {
  /// Returns a builder to configure and create a `Docket` instance.
  pub fn builder() -> DocketBuilder {
    DocketBuilder::new()
  }

  /// Creates (or re-asserts) the named job.
  ///
  /// - No record with this name exists: persists a new record from
  ///   `options` (due defaults to one minute from now), installs a timer,
  ///   and returns the new record.
  /// - The record exists and `options.restart` is set: cancels the live
  ///   timer and installs a fresh one for the *stored* due spec, then
  ///   returns the existing record.
  /// - The record exists otherwise: returns it unchanged. Create is
  ///   idempotent and installs no second timer.
  ///
  /// # Errors
  ///
  /// Storage lookup/insert failures are logged and returned as
  /// [`SchedulerError::Storage`]; the scheduling table is left untouched.
  pub async fn create_job(
    &self,
    name: &str,
    options: JobOptions,
  ) -> Result<JobRecord, SchedulerError> {
    self.engine.create_job(name, options).await
  }

  /// Removes the named job: cancels its live timer and deletes its durable
  /// record. Returns the deleted record, or `Ok(None)` when no record
  /// exists: removing a nonexistent job is not an error.
  ///
  /// Once this returns `Ok`, no handler for `name` fires again from timers
  /// installed before the call; a firing already in flight is suppressed by
  /// the cancellation guard.
  ///
  /// # Errors
  ///
  /// Storage failures are logged and returned as
  /// [`SchedulerError::Storage`]. After a failed lookup the job stays in
  /// the cancelling state, and the next firing completes the removal.
  pub async fn remove_job(&self, name: &str) -> Result<Option<JobRecord>, SchedulerError> {
    self.engine.remove_job(name).await
  }

  /// Registers a handler for the named job, appended after any existing
  /// handlers. Handlers may be registered before the job is created and
  /// persist after it completes.
  pub fn add_job_handler(&self, name: &str, handler: JobHandler) {
    self.engine.registry.add(name, handler);
  }

  /// Unregisters a handler previously passed to [`Docket::add_job_handler`],
  /// matched by `Arc` identity. No-op when the name or handler is unknown.
  pub fn remove_job_handler(&self, name: &str, handler: &JobHandler) {
    self.engine.registry.remove(name, handler);
  }
}

/// Per-name lifecycle state. Absence from the table is the third state:
/// never scheduled, or fully removed.
enum JobState {
  /// A live timer is installed.
  Scheduled(Box<dyn TimerHandle>),
  /// Removal has been requested but not completed. The handle, if any, is
  /// the still-live timer awaiting cancellation.
  Cancelling(Option<Box<dyn TimerHandle>>),
}

impl JobState {
  fn into_handle(self) -> Option<Box<dyn TimerHandle>> {
    match self {
      JobState::Scheduled(handle) => Some(handle),
      JobState::Cancelling(handle) => handle,
    }
  }
}

/// Copyable view of a job's lifecycle state, for checks that must not hold
/// the table lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StateTag {
  Absent,
  Scheduled,
  Cancelling,
}

/// The engine internals shared between the public handle, timer callbacks,
/// and the reconciliation task.
///
/// `table` is the scheduling table and cancellation set in one map; the
/// engine is its sole mutator, and the lock is never held across an await
/// point or a handler invocation.
struct Engine {
  store: Arc<dyn JobStore>,
  timer: Arc<dyn Timer>,
  registry: HandlerRegistry,
  table: Mutex<HashMap<String, JobState>>,
}

impl Engine {
  /// Startup reconciliation: re-derive the scheduling table from storage.
  async fn reconcile(self: Arc<Self>) {
    match self.store.find_all().await {
      Ok(records) => {
        info!(count = records.len(), "Restored pending jobs from storage.");
        for record in &records {
          self.schedule_job(record);
        }
      }
      Err(error) => {
        error!(%error, "Failed to load jobs from storage; starting with an empty schedule.");
      }
    }
  }

  async fn create_job(
    self: &Arc<Self>,
    name: &str,
    options: JobOptions,
  ) -> Result<JobRecord, SchedulerError> {
    let existing = match self.store.find_by_name(name).await {
      Ok(existing) => existing,
      Err(error) => {
        error!(name, %error, "Failed to look up job during create.");
        return Err(error.into());
      }
    };

    if let Some(record) = existing {
      if options.restart {
        debug!(name, "Restarting schedule for existing job.");
        self.cancel_job(&record.name);
        self.schedule_job(&record);
      } else {
        debug!(name, "Job already exists; returning existing record.");
      }
      return Ok(record);
    }

    let record = JobRecord {
      id: Uuid::new_v4(),
      name: name.to_string(),
      due: options.due_or_default(),
      remove_on_complete: options.remove_on_complete,
      created: Utc::now(),
      data: options.data,
      kind: RECORD_KIND.to_string(),
    };
    debug!(name, due = ?record.due, "Creating job.");
    let record = match self.store.insert(record).await {
      Ok(record) => record,
      Err(error) => {
        error!(name, %error, "Failed to persist new job.");
        return Err(error.into());
      }
    };
    self.schedule_job(&record);
    Ok(record)
  }

  /// Installs a timer for `record` and registers it in the table.
  ///
  /// The fire callback holds a `Weak` engine reference, so live timers do
  /// not keep a dropped engine alive.
  fn schedule_job(self: &Arc<Self>, record: &JobRecord) {
    debug!(name = %record.name, due = ?record.due, "Scheduling job.");
    let engine = Arc::downgrade(self);
    let snapshot = record.clone();
    let on_fire: BoxedFireFn = Box::new(move || {
      let engine = engine.clone();
      let snapshot = snapshot.clone();
      Box::pin(async move {
        if let Some(engine) = engine.upgrade() {
          engine.on_fire(snapshot).await;
        }
      })
    });
    // The lock spans the (synchronous) schedule call: a past-due timer can
    // fire on another worker thread immediately, and its table check must
    // not observe the gap between installing and registering the handle.
    let mut table = self.table.lock();
    let handle = self.timer.schedule(record.due.clone(), on_fire);
    table.insert(record.name.clone(), JobState::Scheduled(handle));
  }

  /// Entry point for every timer firing.
  ///
  /// Storage is the source of truth: the record is re-fetched by durable id
  /// so concurrent edits and removals are observed. A missing record means
  /// the job was removed, except for recurring jobs whose record was
  /// deleted on completion; those keep firing from the schedule-time
  /// snapshot while their table entry is still `Scheduled`.
  async fn on_fire(self: Arc<Self>, snapshot: JobRecord) {
    let fetched = match self.store.find_by_id(snapshot.id).await {
      Ok(fetched) => fetched,
      Err(error) => {
        error!(name = %snapshot.name, %error, "Failed to re-read job record on firing.");
        return;
      }
    };

    let (record, durable) = match fetched {
      Some(record) => (record, true),
      None => {
        if snapshot.recurring() && self.state_of(&snapshot.name) == StateTag::Scheduled {
          (snapshot, false)
        } else {
          return;
        }
      }
    };

    match self.state_of(&record.name) {
      StateTag::Absent => {
        debug!(name = %record.name, "Timer fired for a job no longer scheduled; ignoring.");
      }
      StateTag::Scheduled | StateTag::Cancelling => self.run_job(record, durable).await,
    }
  }

  /// Invokes the handlers for a fired job, honoring the cancellation window
  /// and remove-on-complete. `durable` is false when `record` is a
  /// schedule-time snapshot rather than a fresh read from storage.
  async fn run_job(self: &Arc<Self>, record: JobRecord, durable: bool) {
    if self.state_of(&record.name) == StateTag::Cancelling {
      warn!(name = %record.name, "Job fired while being removed; completing removal instead.");
      if let Err(error) = self.remove_job(&record.name).await {
        error!(name = %record.name, %error, "Failed to complete removal of a cancelling job.");
      }
      return;
    }

    debug!(name = %record.name, "Running job.");
    let handlers = self.registry.handlers_for(&record.name);
    if handlers.is_empty() {
      warn!(name = %record.name, "Job fired without registered handlers.");
    }
    // Handler panics are not caught; they propagate to the firing task.
    for handler in &handlers {
      handler(&record);
    }

    if durable && record.remove_on_complete {
      if record.recurring() {
        // Only the durable record goes away; the live timer keeps the job
        // firing in-process until it is explicitly removed. A restart would
        // no longer resurrect it.
        if let Err(error) = self.store.remove(&record).await {
          error!(name = %record.name, %error, "Failed to remove completed recurring job record.");
        }
      } else if let Err(error) = self.remove_job(&record.name).await {
        error!(name = %record.name, %error, "Failed to remove job on completion.");
      }
    }
  }

  async fn remove_job(self: &Arc<Self>, name: &str) -> Result<Option<JobRecord>, SchedulerError> {
    debug!(name, "Removing job.");
    // Marked before the first await so an in-flight firing observes the
    // cancellation window.
    self.mark_cancelling(name);

    let found = match self.store.find_by_name(name).await {
      Ok(found) => found,
      Err(error) => {
        // The cancelling marker stays; a firing that observes it completes
        // the removal.
        error!(name, %error, "Failed to look up job for removal.");
        return Err(error.into());
      }
    };

    match found {
      None => {
        // No durable record, but a live timer may remain (recurring jobs
        // removed on completion). Clear it along with the marker.
        self.cancel_job(name);
        Ok(None)
      }
      Some(record) => {
        self.cancel_job(&record.name);
        if let Err(error) = self.store.remove(&record).await {
          error!(name, %error, "Failed to delete job record.");
          return Err(error.into());
        }
        Ok(Some(record))
      }
    }
  }

  /// Cancels the live timer for `name`, if any, and clears its table entry
  /// whatever its state. Clearing also releases any cancellation marker.
  fn cancel_job(&self, name: &str) {
    let entry = self.table.lock().remove(name);
    if let Some(handle) = entry.and_then(JobState::into_handle) {
      debug!(name, "Cancelling live timer.");
      handle.cancel();
    }
  }

  /// Transitions `name` into the cancelling state, preserving any live
  /// timer handle for later cancellation.
  fn mark_cancelling(&self, name: &str) {
    let mut table = self.table.lock();
    let handle = table.remove(name).and_then(JobState::into_handle);
    table.insert(name.to_string(), JobState::Cancelling(handle));
  }

  fn state_of(&self, name: &str) -> StateTag {
    match self.table.lock().get(name) {
      None => StateTag::Absent,
      Some(JobState::Scheduled(_)) => StateTag::Scheduled,
      Some(JobState::Cancelling(_)) => StateTag::Cancelling,
    }
  }
}

impl Drop for Engine {
  /// Teardown: cancels every live timer so no tasks outlive the engine.
  /// Durable records are untouched; a firing already dispatched holds only
  /// a `Weak` engine reference and becomes a no-op.
  fn drop(&mut self) {
    for (name, state) in self.table.get_mut().drain() {
      if let Some(handle) = state.into_handle() {
        debug!(name = %name, "Cancelling live timer on engine drop.");
        handle.cancel();
      }
    }
  }
}
