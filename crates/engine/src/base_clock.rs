//! Base clock adapter: the single tick source every frequency derives from

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use triggers_ports::{Scheduler, SchedulerResult, TickCallback, TimerHandle};

use crate::error::{TriggerError, TriggerResult};

/// Periodic tick source at a fixed base interval
///
/// The base interval is the finest granularity the engine resolves and never
/// changes after construction.
#[derive(Clone)]
pub struct BaseClock {
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
}

impl BaseClock {
    /// 50 Hz, the fastest supported frequency
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

    pub fn with_default_interval(scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    pub fn new(scheduler: Arc<dyn Scheduler>, interval: Duration) -> TriggerResult<Self> {
        if interval.is_zero() {
            return Err(TriggerError::Misconfigured(
                "base interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            scheduler,
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    /// Cold stream of base ticks
    ///
    /// Nothing is scheduled until the stream is subscribed to, and every
    /// subscription gets its own timer starting at subscription time.
    pub fn ticks(&self) -> TickStream {
        TickStream {
            clock: self.clone(),
        }
    }
}

impl fmt::Debug for BaseClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseClock")
            .field("scheduler", &self.scheduler.name())
            .field("interval", &self.interval)
            .finish()
    }
}

/// Recipe for a base tick subscription
#[derive(Clone, Debug)]
pub struct TickStream {
    clock: BaseClock,
}

impl TickStream {
    /// Register a recurring timer delivering every base tick to `callback`
    ///
    /// The timer is cancelled when the returned handle is cancelled or dropped.
    pub fn subscribe(&self, callback: TickCallback) -> SchedulerResult<TimerHandle> {
        self.clock
            .scheduler
            .schedule_periodic(self.clock.interval, callback)
    }
}
