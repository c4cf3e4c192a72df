use crate::rule::DueSpec;

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type alias for the durable identifier of a job record. Uses UUID v4.
pub type JobId = Uuid;

/// The discriminator stored in every record's `type` field, so docket jobs
/// can coexist with other record types in a shared document store.
pub const RECORD_KIND: &str = "docket-job";

/// Seconds until the default due time when [`JobOptions::due`] is left unset.
const DEFAULT_DUE_SECS: i64 = 60;

/// A handler invoked with the current job record each time the job fires.
///
/// Handlers run synchronously, in registration order, on the firing task.
/// Panics are not caught by the engine. Removal via
/// [`Docket::remove_job_handler`](crate::Docket::remove_job_handler) matches
/// by `Arc` identity, so keep a clone of the `Arc` you registered.
pub type JobHandler = Arc<dyn Fn(&JobRecord) + Send + Sync + 'static>;

/// The durable description of a named scheduled job.
///
/// Owned by the [`JobStore`](crate::store::JobStore); the engine re-reads it
/// from storage on every firing rather than trusting its in-memory copy.
/// `name` is treated as immutable once the record is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
  /// Durable identifier, assigned at creation. Timer callbacks re-fetch by
  /// this id rather than by name.
  pub id: JobId,
  /// Unique job name; the primary key of the public API.
  pub name: String,
  /// When the job is due: one-shot instant or recurrence rule.
  pub due: DueSpec,
  /// Delete the durable record once the job has fired. Defaults to `true`.
  /// For recurring jobs only the durable record is removed; the live timer
  /// keeps firing in-process until the job is explicitly removed.
  pub remove_on_complete: bool,
  /// Insertion timestamp.
  pub created: DateTime<Utc>,
  /// Caller-supplied payload, opaque to the engine.
  pub data: serde_json::Value,
  /// Record discriminator, always [`RECORD_KIND`].
  #[serde(rename = "type")]
  pub kind: String,
}

impl JobRecord {
  /// Whether this job fires repeatedly.
  pub fn recurring(&self) -> bool {
    self.due.is_recurring()
  }
}

/// Options accepted by [`Docket::create_job`](crate::Docket::create_job).
#[derive(Debug, Clone)]
pub struct JobOptions {
  /// When the job is due. `None` defaults to one minute from now.
  pub due: Option<DueSpec>,
  /// Delete the durable record after firing (default `true`).
  pub remove_on_complete: bool,
  /// When the named job already exists, cancel its live timer and install a
  /// fresh one (the stored due spec is unchanged). Default `false`.
  pub restart: bool,
  /// Opaque payload stored on the record (default `Null`).
  pub data: serde_json::Value,
}

impl Default for JobOptions {
  fn default() -> Self {
    Self {
      due: None,
      remove_on_complete: true,
      restart: false,
      data: serde_json::Value::Null,
    }
  }
}

impl JobOptions {
  /// Options for a one-shot job due at `at`.
  pub fn at(at: DateTime<Utc>) -> Self {
    Self {
      due: Some(DueSpec::At(at)),
      ..Self::default()
    }
  }

  /// Options for a recurring job following `rule`.
  pub fn every(rule: crate::rule::RecurrenceRule) -> Self {
    Self {
      due: Some(DueSpec::Every(rule)),
      ..Self::default()
    }
  }

  /// Keeps the durable record after the job fires.
  pub fn keep_after_complete(mut self) -> Self {
    self.remove_on_complete = false;
    self
  }

  /// Requests a timer reset when the named job already exists.
  pub fn restart(mut self) -> Self {
    self.restart = true;
    self
  }

  /// Attaches a caller payload to the record.
  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = data;
    self
  }

  /// Resolves the effective due spec, applying the one-minute default.
  pub(crate) fn due_or_default(&self) -> DueSpec {
    self
      .due
      .clone()
      .unwrap_or_else(|| DueSpec::At(Utc::now() + ChronoDuration::seconds(DEFAULT_DUE_SECS)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn record_serializes_with_type_discriminator() {
    let record = JobRecord {
      id: Uuid::new_v4(),
      name: "nightly-report".into(),
      due: DueSpec::At(Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).single().unwrap()),
      remove_on_complete: true,
      created: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).single().unwrap(),
      data: serde_json::json!({ "report": "daily" }),
      kind: RECORD_KIND.to_string(),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["type"], RECORD_KIND);
    assert_eq!(json["name"], "nightly-report");

    let back: JobRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
    assert!(!back.recurring());
  }

  #[test]
  fn options_default_due_is_about_a_minute_out() {
    let options = JobOptions::default();
    let before = Utc::now();
    match options.due_or_default() {
      DueSpec::At(at) => {
        let delta = at - before;
        assert!(delta >= ChronoDuration::seconds(59));
        assert!(delta <= ChronoDuration::seconds(61));
      }
      DueSpec::Every(_) => panic!("default due should be one-shot"),
    }
  }
}
