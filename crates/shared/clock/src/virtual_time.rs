use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use triggers_core::Timestamp;
use triggers_ports::{
    Clock, Scheduler, SchedulerError, SchedulerResult, Tick, TickCallback, TimerControl,
    TimerHandle,
};

type TimerId = u64;

/// Queue priority: earliest due time first, then registration order
type DueAt = Reverse<(Duration, u64)>;

/// Scheduler driven by virtual time, for deterministic testing
///
/// Time only moves when [`advance_by`](Self::advance_by) or
/// [`advance_to`](Self::advance_to) is called. Every timer that falls due up
/// to and including the target instant fires synchronously on the calling
/// thread, in due-time order. Timers due at the same instant fire in the
/// order they were registered.
///
/// ```text
///  t=0        t=20       t=40       t=60
///   │ schedule  │ tick      │ tick      │ tick
///   └───────────┴───────────┴───────────┘
///       advance_to(60ms) delivers 3 ticks
/// ```
///
/// Callbacks may register or cancel timers, or shut the scheduler down, while
/// being invoked, but must not advance the scheduler themselves.
pub struct VirtualScheduler {
    inner: Arc<VirtualInner>,
}

struct VirtualInner {
    /// Wall-clock anchor reported by `Clock::now` at zero elapsed time
    epoch: Timestamp,
    state: Mutex<VirtualState>,
}

#[derive(Default)]
struct VirtualState {
    /// Virtual time elapsed since creation
    elapsed: Duration,
    queue: PriorityQueue<TimerId, DueAt>,
    timers: HashMap<TimerId, TimerEntry>,
    next_id: TimerId,
    next_seq: u64,
    shut_down: bool,
}

struct TimerEntry {
    interval: Duration,
    slot: Arc<TimerSlot>,
}

/// Delivery state of one timer, shared with whichever thread is firing it
struct TimerSlot {
    active: Arc<AtomicBool>,
    callback: Mutex<TickCallback>,
    /// Termination recorded while the callback was busy
    pending: Mutex<Option<SchedulerError>>,
}

impl TimerSlot {
    fn new(active: Arc<AtomicBool>, callback: TickCallback) -> Self {
        Self {
            active,
            callback: Mutex::new(callback),
            pending: Mutex::new(None),
        }
    }

    /// Deliver one elapsed tick unless the timer stopped in the meantime
    fn elapse(&self) {
        {
            let mut callback = self.callback.lock();
            if self.active.load(Ordering::Acquire) {
                (*callback)(Tick::Elapsed);
            }
        }
        self.flush_termination();
    }

    /// Stop the timer and deliver `Tick::Terminated`
    ///
    /// If the callback is running, on this thread or another, the
    /// termination is left pending and delivered once it returns.
    fn terminate(&self, err: SchedulerError) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        *self.pending.lock() = Some(err);

        if let Some(mut callback) = self.callback.try_lock() {
            let pending = self.pending.lock().take();
            if let Some(err) = pending {
                (*callback)(Tick::Terminated(err));
            }
        }
    }

    fn flush_termination(&self) {
        let pending = self.pending.lock().take();
        if let Some(err) = pending {
            let mut callback = self.callback.lock();
            (*callback)(Tick::Terminated(err));
        }
    }
}

impl VirtualState {
    fn enqueue(&mut self, id: TimerId, due: Duration) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(id, Reverse((due, seq)));
    }
}

impl VirtualScheduler {
    /// Create a virtual scheduler anchored at the current wall time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Create a virtual scheduler anchored at a specific time
    pub fn at(epoch: Timestamp) -> Self {
        Self {
            inner: Arc::new(VirtualInner {
                epoch,
                state: Mutex::new(VirtualState::default()),
            }),
        }
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.inner.state.lock().elapsed
    }

    /// Number of timers currently registered
    pub fn pending_timers(&self) -> usize {
        self.inner.state.lock().timers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.state.lock().shut_down
    }

    /// Advance virtual time by `duration`, firing every timer due on the way
    pub fn advance_by(&self, duration: Duration) {
        let target = self.elapsed() + duration;
        self.advance_to(target);
    }

    /// Advance virtual time to `target` (measured from creation)
    ///
    /// Moving backwards is a no-op.
    pub fn advance_to(&self, target: Duration) {
        while let Some(slot) = self.pop_due(target) {
            slot.elapse();
        }

        let mut state = self.inner.state.lock();
        if target > state.elapsed {
            state.elapsed = target;
        }
    }

    /// Pop the next timer due at or before `target` and requeue it one
    /// interval later. The state lock is released before the callback runs.
    fn pop_due(&self, target: Duration) -> Option<Arc<TimerSlot>> {
        let mut state = self.inner.state.lock();

        let (&id, &Reverse((due, _))) = state.queue.peek()?;
        if due > target {
            return None;
        }
        state.queue.pop();

        if due > state.elapsed {
            state.elapsed = due;
        }

        let entry = state.timers.get(&id)?;
        let interval = entry.interval;
        let slot = Arc::clone(&entry.slot);
        state.enqueue(id, due + interval);

        Some(slot)
    }

    /// Shut the scheduler down
    ///
    /// Every registered timer receives `Tick::Terminated(SchedulerError::ShutDown)`
    /// and later registrations fail.
    pub fn shutdown(&self) {
        let mut entries: Vec<(TimerId, TimerEntry)> = {
            let mut state = self.inner.state.lock();
            if state.shut_down {
                return;
            }
            state.shut_down = true;
            state.queue.clear();
            state.timers.drain().collect()
        };
        entries.sort_by_key(|(id, _)| *id);

        log::warn!(
            "Virtual scheduler shut down with {} live timer(s)",
            entries.len()
        );

        for (_, entry) in entries {
            entry.slot.terminate(SchedulerError::ShutDown);
        }
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VirtualScheduler {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Clock for VirtualScheduler {
    fn now(&self) -> Timestamp {
        let elapsed = ChronoDuration::from_std(self.elapsed()).unwrap_or(ChronoDuration::zero());
        self.inner.epoch + elapsed
    }

    fn name(&self) -> &str {
        "VirtualScheduler"
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_periodic(
        &self,
        interval: Duration,
        callback: TickCallback,
    ) -> SchedulerResult<TimerHandle> {
        if interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }

        let mut state = self.inner.state.lock();
        if state.shut_down {
            return Err(SchedulerError::ShutDown);
        }

        let id = state.next_id;
        state.next_id += 1;

        let active = Arc::new(AtomicBool::new(true));
        state.timers.insert(
            id,
            TimerEntry {
                interval,
                slot: Arc::new(TimerSlot::new(active.clone(), callback)),
            },
        );
        let due = state.elapsed + interval;
        state.enqueue(id, due);

        log::trace!("Virtual timer {} registered every {:?}", id, interval);

        Ok(TimerHandle::new(VirtualTimer {
            id,
            active,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct VirtualTimer {
    id: TimerId,
    active: Arc<AtomicBool>,
    inner: Arc<VirtualInner>,
}

impl TimerControl for VirtualTimer {
    fn cancel(&self) {
        self.active.store(false, Ordering::Release);

        // Drop the callback outside the lock, its captures may own other timers
        let removed = {
            let mut state = self.inner.state.lock();
            state.queue.remove(&self.id);
            state.timers.remove(&self.id)
        };
        drop(removed);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
