use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use triggers_core::Timestamp;
use triggers_ports::{
    Clock, Scheduler, SchedulerError, SchedulerResult, Tick, TickCallback, TimerControl,
    TimerHandle,
};

/// Real-time scheduler for production use
///
/// Each periodic timer runs as its own task on a tokio runtime, driven by
/// `tokio::time::interval`. Ticks are delivered on whichever worker thread
/// polls the task.
///
/// Missed ticks are delivered in a burst so the number of ticks always
/// matches the elapsed time, even when the runtime falls behind.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Create a scheduler spawning timers on the given runtime
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a scheduler on the runtime of the calling thread
    pub fn current() -> SchedulerResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SchedulerError::NoRuntime)
    }
}

impl Clock for TokioScheduler {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "TokioScheduler"
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_periodic(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> SchedulerResult<TimerHandle> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        let active = Arc::new(AtomicBool::new(true));
        let registration = Arc::new(AtomicU8::new(PENDING));
        let mut guard = TickGuard {
            callback,
            active: active.clone(),
            registration: registration.clone(),
        };

        // First tick one interval after registration, not after the first poll
        let start = Instant::now() + interval;
        let task = self.handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

            loop {
                ticker.tick().await;
                if !guard.active.load(Ordering::Acquire) {
                    break;
                }
                (guard.callback)(Tick::Elapsed);
            }
        });

        // A shut-down runtime drops the task inside `spawn`
        if registration
            .compare_exchange(PENDING, ARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("Runtime is shut down, timer not registered");
            return Err(SchedulerError::RuntimeShutdown);
        }

        Ok(TimerHandle::new(TokioTimer {
            active,
            task: task.abort_handle(),
        }))
    }
}

/// Registration states of a timer task
const PENDING: u8 = 0;
const ARMED: u8 = 1;
const REFUSED: u8 = 2;

/// Owns the callback inside the timer task
///
/// If the task is dropped while still active, the runtime went away under it.
/// A task dropped before registration completed was refused outright and
/// reports nothing: the caller gets an error instead.
struct TickGuard {
    callback: TickCallback,
    active: Arc<AtomicBool>,
    registration: Arc<AtomicU8>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        if self
            .registration
            .compare_exchange(PENDING, REFUSED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return;
        }

        if self.active.swap(false, Ordering::AcqRel) {
            log::warn!("Timer task dropped by the runtime, terminating timer");
            (self.callback)(Tick::Terminated(SchedulerError::RuntimeShutdown));
        }
    }
}

struct TokioTimer {
    active: Arc<AtomicBool>,
    task: AbortHandle,
}

impl TimerControl for TokioTimer {
    fn cancel(&self) {
        self.active.store(false, Ordering::Release);
        self.task.abort();
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
