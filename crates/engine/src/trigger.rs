//! Triggers and their subscriptions

use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use triggers_core::{Frequency, Pulse};
use triggers_ports::{SchedulerError, Tick, TickCallback, TimerHandle};

use crate::base_clock::TickStream;
use crate::decimator::Decimator;
use crate::error::TriggerResult;

/// Cached definition of a derived frequency
///
/// Stateless: it only says how to decimate the base ticks. Counting state is
/// created per subscription.
#[derive(Debug)]
pub(crate) struct Recipe {
    pub(crate) frequency: Frequency,
    pub(crate) cycles: NonZeroU64,
    pub(crate) ticks: TickStream,
}

/// A stream of pulses at one frequency
///
/// Cheap to clone. Every call to `subscribe` starts an independent counting
/// window at subscription time, backed by its own base tick timer.
#[derive(Clone)]
pub struct Trigger {
    frequency: Frequency,
    recipe: Option<Arc<Recipe>>,
}

impl Trigger {
    /// A trigger that never emits and never completes
    pub(crate) fn never() -> Self {
        Self {
            frequency: Frequency::Never,
            recipe: None,
        }
    }

    pub(crate) fn from_recipe(recipe: Arc<Recipe>) -> Self {
        Self {
            frequency: recipe.frequency,
            recipe: Some(recipe),
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Base ticks per pulse, `None` for `Never`
    pub fn cycles(&self) -> Option<u64> {
        self.recipe.as_ref().map(|recipe| recipe.cycles.get())
    }

    /// Returns true if both triggers share the same cached recipe
    pub fn same_recipe(a: &Trigger, b: &Trigger) -> bool {
        match (&a.recipe, &b.recipe) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y),
            (None, None) => a.frequency == b.frequency,
            _ => false,
        }
    }

    /// Subscribe to pulses
    pub fn subscribe<F>(&self, on_pulse: F) -> TriggerResult<Subscription>
    where
        F: FnMut(Pulse) + Send + 'static,
    {
        self.subscribe_with(on_pulse, |_| {})
    }

    /// Subscribe to pulses and to terminal scheduler failure
    ///
    /// `on_terminated` runs at most once, after which no pulse is delivered.
    pub fn subscribe_with<F, T>(&self, mut on_pulse: F, on_terminated: T) -> TriggerResult<Subscription>
    where
        F: FnMut(Pulse) + Send + 'static,
        T: FnOnce(SchedulerError) + Send + 'static,
    {
        let Some(recipe) = &self.recipe else {
            log::debug!("Subscribed to {} (silent)", self.frequency);
            return Ok(Subscription::silent(self.frequency, Box::new(on_pulse)));
        };

        let shared = Arc::new(SubscriptionShared::new(SubscriptionState::Counting));
        let frequency = self.frequency;
        let mut decimator = Decimator::new(recipe.cycles);
        let mut on_terminated = Some(on_terminated);

        let state = Arc::clone(&shared);
        let callback: TickCallback = Box::new(move |tick| match tick {
            Tick::Elapsed => {
                if decimator.tick() {
                    let n = state.pulses.fetch_add(1, Ordering::Relaxed) + 1;
                    log::trace!("{} pulse #{}", frequency, n);
                    on_pulse(Pulse);
                }
            }
            Tick::Terminated(err) => {
                state.set(SubscriptionState::Terminated);
                log::warn!("{} subscription terminated: {}", frequency, err);
                if let Some(on_terminated) = on_terminated.take() {
                    on_terminated(err);
                }
            }
        });

        let timer = recipe.ticks.subscribe(callback)?;
        log::debug!(
            "Subscribed to {} ({} base ticks per pulse)",
            frequency,
            recipe.cycles
        );

        Ok(Subscription {
            frequency,
            timer: Some(timer),
            parked: None,
            shared,
        })
    }

    /// Subscribe through an unbounded channel, for async consumers
    ///
    /// The channel closes when the subscription ends. For `Never` it stays
    /// open and empty for as long as the subscription lives.
    pub fn subscribe_channel(&self) -> TriggerResult<(Subscription, mpsc::UnboundedReceiver<Pulse>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(move |pulse| {
            // Receiver gone: nothing left to notify
            let _ = tx.send(pulse);
        })?;
        Ok((subscription, rx))
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("frequency", &self.frequency)
            .field("cycles", &self.cycles())
            .finish()
    }
}

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Subscribed to `Never`: alive, but nothing will ever arrive
    Silent,
    /// Counting base ticks towards the next pulse
    Counting,
    /// Ended by the subscriber
    Cancelled,
    /// Ended by a scheduler failure
    Terminated,
}

struct SubscriptionShared {
    state: Mutex<SubscriptionState>,
    pulses: AtomicU64,
}

impl SubscriptionShared {
    fn new(state: SubscriptionState) -> Self {
        Self {
            state: Mutex::new(state),
            pulses: AtomicU64::new(0),
        }
    }

    fn set(&self, state: SubscriptionState) {
        *self.state.lock() = state;
    }
}

/// Handle to an active subscription
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    frequency: Frequency,
    timer: Option<TimerHandle>,
    /// Callback held by a `Never` subscription so whatever it owns stays alive
    parked: Option<Box<dyn FnMut(Pulse) + Send>>,
    shared: Arc<SubscriptionShared>,
}

impl Subscription {
    fn silent(frequency: Frequency, on_pulse: Box<dyn FnMut(Pulse) + Send>) -> Self {
        Self {
            frequency,
            timer: None,
            parked: Some(on_pulse),
            shared: Arc::new(SubscriptionShared::new(SubscriptionState::Silent)),
        }
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn state(&self) -> SubscriptionState {
        *self.shared.state.lock()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            SubscriptionState::Counting | SubscriptionState::Silent
        )
    }

    /// Pulses delivered to this subscription so far
    pub fn pulses(&self) -> u64 {
        self.shared.pulses.load(Ordering::Relaxed)
    }

    /// Stop receiving pulses
    ///
    /// Only this subscription's base timer is cancelled; other subscriptions
    /// and the cached recipe are untouched.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        let was_active = {
            let mut state = self.shared.state.lock();
            let active = matches!(
                *state,
                SubscriptionState::Counting | SubscriptionState::Silent
            );
            if active {
                *state = SubscriptionState::Cancelled;
            }
            active
        };

        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        self.parked = None;

        if was_active {
            log::debug!(
                "Unsubscribed from {} after {} pulse(s)",
                self.frequency,
                self.pulses()
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("frequency", &self.frequency)
            .field("state", &self.state())
            .field("pulses", &self.pulses())
            .finish()
    }
}
