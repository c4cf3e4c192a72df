use chrono::{DateTime, Datelike, Days, Duration as ChronoDuration, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Upper bound on field-stepping iterations in [`RecurrenceRule::next_after`].
/// Rules that cannot match within this many steps (e.g. February 31st, or an
/// out-of-range field value) are treated as having no next occurrence.
const MAX_STEPS: usize = 4096;

/// When a job is due: once at an absolute instant, or repeatedly per a
/// [`RecurrenceRule`].
///
/// The variant doubles as the one-shot/recurring selector: a record whose
/// due spec is [`DueSpec::Every`] is a recurring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec", rename_all = "snake_case")]
pub enum DueSpec {
  /// Fire once at the given UTC instant. Instants in the past fire
  /// immediately (startup reconciliation relies on this).
  At(DateTime<Utc>),
  /// Fire repeatedly at every instant matching the rule, until cancelled.
  Every(RecurrenceRule),
}

impl DueSpec {
  /// Whether this spec describes a recurring job.
  pub fn is_recurring(&self) -> bool {
    matches!(self, DueSpec::Every(_))
  }
}

/// A structured description of a repeating due pattern, interpreted in UTC.
///
/// Each field constrains one calendar component; `None` means "every value
/// of this field". All set fields must match for an instant to qualify
/// (AND semantics). The default rule fixes only `second = 0`, i.e. it fires
/// once per minute.
///
/// ```
/// use docket::RecurrenceRule;
///
/// // Every day at 07:30:00 UTC.
/// let rule = RecurrenceRule::daily_at(7, 30);
/// // Every second.
/// let tick = RecurrenceRule::every_second();
/// # let _ = (rule, tick);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
  /// Second of the minute (0-59).
  pub second: Option<u32>,
  /// Minute of the hour (0-59).
  pub minute: Option<u32>,
  /// Hour of the day (0-23).
  pub hour: Option<u32>,
  /// Day of the month (1-31).
  pub day_of_month: Option<u32>,
  /// Month of the year (1-12).
  pub month: Option<u32>,
  /// Day of the week.
  pub day_of_week: Option<Weekday>,
}

impl Default for RecurrenceRule {
  fn default() -> Self {
    Self {
      second: Some(0),
      minute: None,
      hour: None,
      day_of_month: None,
      month: None,
      day_of_week: None,
    }
  }
}

impl RecurrenceRule {
  /// A rule that matches every second.
  pub fn every_second() -> Self {
    Self {
      second: None,
      minute: None,
      hour: None,
      day_of_month: None,
      month: None,
      day_of_week: None,
    }
  }

  /// A rule that matches once per day at `hour:minute:00` UTC.
  pub fn daily_at(hour: u32, minute: u32) -> Self {
    Self {
      second: Some(0),
      minute: Some(minute),
      hour: Some(hour),
      day_of_month: None,
      month: None,
      day_of_week: None,
    }
  }

  /// Computes the next matching instant strictly after `after`.
  ///
  /// Steps field-wise (month, day, hour, minute, second), skipping whole
  /// calendar units on mismatch, so the search is cheap for realistic rules.
  /// Returns `None` for rules that never match (bounded search).
  pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut t = (after + ChronoDuration::seconds(1)).with_nanosecond(0)?;
    for _ in 0..MAX_STEPS {
      if let Some(month) = self.month {
        if t.month() != month {
          t = start_of_next_month(t)?;
          continue;
        }
      }
      if !self.day_matches(t) {
        t = start_of_next_day(t)?;
        continue;
      }
      if let Some(hour) = self.hour {
        if t.hour() != hour {
          t = start_of_next_hour(t)?;
          continue;
        }
      }
      if let Some(minute) = self.minute {
        if t.minute() != minute {
          t = start_of_next_minute(t)?;
          continue;
        }
      }
      if let Some(second) = self.second {
        if t.second() != second {
          t = t + ChronoDuration::seconds(1);
          continue;
        }
      }
      return Some(t);
    }
    None
  }

  fn day_matches(&self, t: DateTime<Utc>) -> bool {
    if let Some(day) = self.day_of_month {
      if t.day() != day {
        return false;
      }
    }
    if let Some(weekday) = self.day_of_week {
      if t.weekday() != weekday {
        return false;
      }
    }
    true
  }
}

fn start_of_next_month(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
  let (year, month) = if t.month() == 12 {
    (t.year() + 1, 1)
  } else {
    (t.year(), t.month() + 1)
  };
  Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

fn start_of_next_day(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
  let next = t.date_naive().checked_add_days(Days::new(1))?;
  let naive = next.and_hms_opt(0, 0, 0)?;
  Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

fn start_of_next_hour(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
  Some(t.with_minute(0)?.with_second(0)? + ChronoDuration::hours(1))
}

fn start_of_next_minute(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
  Some(t.with_second(0)? + ChronoDuration::minutes(1))
}
