//! Triggers Ports
//!
//! Port definitions (traits) for the triggers frequency engine.
//! These define the boundary between the engine and the time source driving it.

mod clock;
mod error;
mod scheduler;

pub use clock::Clock;
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{Scheduler, Tick, TickCallback, TimerControl, TimerHandle};
