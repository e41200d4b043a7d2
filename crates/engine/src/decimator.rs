//! Decimate-by-count: turn every Nth base tick into one pulse

use std::num::NonZeroU64;
use std::time::Duration;

/// Per-subscription counting state
///
/// ```text
/// Counting(0) --tick--> Counting(1) --tick--> ... --tick--> pulse, Counting(0)
///                                                  (count == cycles)
/// ```
///
/// The first pulse comes after exactly `cycles` ticks, never at creation.
#[derive(Debug, Clone)]
pub struct Decimator {
    cycles: NonZeroU64,
    count: u64,
}

impl Decimator {
    pub fn new(cycles: NonZeroU64) -> Self {
        Self { cycles, count: 0 }
    }

    /// Feed one base tick. Returns true when a pulse is due.
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if self.count == self.cycles.get() {
            self.count = 0;
            true
        } else {
            false
        }
    }

    /// Ticks counted since the last pulse
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }
}

/// Number of base ticks per period
///
/// Returns `None` unless `period` is a non-zero exact multiple of
/// `base_interval`; integer truncation would silently change the cadence.
pub fn decimation_factor(period: Duration, base_interval: Duration) -> Option<NonZeroU64> {
    let base = base_interval.as_nanos();
    if base == 0 {
        return None;
    }

    let period = period.as_nanos();
    if period % base != 0 {
        return None;
    }

    u64::try_from(period / base).ok().and_then(NonZeroU64::new)
}
