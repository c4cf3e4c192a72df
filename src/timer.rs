use crate::rule::DueSpec;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::warn;

/// The callback a timer invokes on each firing.
///
/// Returns a boxed future so firings can perform asynchronous work (the
/// engine re-reads the job record from storage inside it).
pub type BoxedFireFn =
  Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> + Send + Sync + 'static>;

/// The timer primitive consumed by the engine.
///
/// Given a due spec, invokes `on_fire` at the right time: once for
/// [`DueSpec::At`], repeatedly for [`DueSpec::Every`], until the returned
/// handle is cancelled.
pub trait Timer: Send + Sync + 'static {
  fn schedule(&self, due: DueSpec, on_fire: BoxedFireFn) -> Box<dyn TimerHandle>;
}

/// A live timer registration. Dropping the handle does *not* cancel the
/// timer; cancellation is explicit and idempotent.
pub trait TimerHandle: Send + Sync {
  /// Stops all future firings. A firing already dispatched keeps running;
  /// the engine's cancellation guard suppresses its handlers.
  fn cancel(&self);
}

/// The default [`Timer`] implementation, backed by Tokio tasks.
///
/// One-shot due times in the past fire immediately. Each firing is spawned
/// onto its own task, so a slow firing never delays the next occurrence of
/// a recurring job, and cancelling the timer never aborts an in-flight
/// firing.
#[derive(Debug, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
  fn schedule(&self, due: DueSpec, on_fire: BoxedFireFn) -> Box<dyn TimerHandle> {
    let task = match due {
      DueSpec::At(at) => Handle::current().spawn(async move {
        sleep_until(at).await;
        tokio::spawn(on_fire());
      }),
      DueSpec::Every(rule) => Handle::current().spawn(async move {
        loop {
          let Some(next) = rule.next_after(Utc::now()) else {
            warn!(?rule, "Recurrence rule has no next occurrence; timer stopping.");
            break;
          };
          sleep_until(next).await;
          tokio::spawn(on_fire());
        }
      }),
    };
    Box::new(TokioTimerHandle { task })
  }
}

struct TokioTimerHandle {
  task: JoinHandle<()>,
}

impl TimerHandle for TokioTimerHandle {
  fn cancel(&self) {
    self.task.abort();
  }
}

async fn sleep_until(at: DateTime<Utc>) {
  let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
  if !delay.is_zero() {
    tokio::time::sleep(delay).await;
  }
}
