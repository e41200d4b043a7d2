use std::fmt;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{SchedulerError, SchedulerResult};

/// Event delivered to a periodic timer callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// One interval has elapsed
    Elapsed,
    /// The scheduler can no longer drive this timer. Always the last event.
    Terminated(SchedulerError),
}

/// Callback invoked by a scheduler on every tick of a periodic timer
pub type TickCallback = Box<dyn FnMut(Tick) + Send>;

/// Port for recurring timers
///
/// Implementations:
/// - Real-time scheduler backed by an async runtime
/// - Virtual scheduler advanced by hand for deterministic tests
///
/// A timer registered at time `t` first fires at `t + interval` and then
/// every `interval`, until its handle is cancelled or dropped.
pub trait Scheduler: Clock {
    /// Register a recurring timer
    fn schedule_periodic(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> SchedulerResult<TimerHandle>;
}

/// Scheduler-side control over one registered timer
pub trait TimerControl: Send + Sync {
    /// Stop the timer
    ///
    /// A tick already being delivered may complete; no new tick starts
    /// once this returns.
    fn cancel(&self);

    /// Returns true while the timer is registered and not terminated
    fn is_active(&self) -> bool;
}

/// Owning handle to a registered timer
///
/// Dropping the handle cancels the timer, so timers never outlive their owner.
pub struct TimerHandle {
    control: Box<dyn TimerControl>,
    cancelled: bool,
}

impl TimerHandle {
    pub fn new(control: impl TimerControl + 'static) -> Self {
        Self {
            control: Box::new(control),
            cancelled: false,
        }
    }

    /// Cancel the timer (idempotent)
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.control.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancelled && self.control.is_active()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("active", &self.is_active())
            .finish()
    }
}
