//! Triggers Clock Infrastructure
//!
//! Scheduler implementations behind the `Scheduler` port:
//!
//! ```text
//! Scheduler (port: now + schedule_periodic)
//!     │
//!     ├── TokioScheduler   (production: one tokio task per timer)
//!     │
//!     └── VirtualScheduler (tests: time moves only when advanced)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use triggers_clock::VirtualScheduler;
//! use std::time::Duration;
//!
//! let scheduler = VirtualScheduler::new();
//! let timer = scheduler.schedule_periodic(Duration::from_millis(20), Box::new(|_| {}))?;
//!
//! scheduler.advance_by(Duration::from_secs(1)); // 50 ticks delivered
//! ```

mod system;
mod virtual_time;

pub use system::TokioScheduler;
pub use virtual_time::VirtualScheduler;

// Re-export the ports for convenience
pub use triggers_ports::{Clock, Scheduler};
