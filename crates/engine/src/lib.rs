//! Triggers - periodic pulses at named frequencies from one base clock
//!
//! Consumers ask for a [`Frequency`] and subscribe to the resulting
//! [`Trigger`]. Every frequency is derived from a single base tick interval
//! by counting ticks, instead of running one timer per frequency.
//!
//! ## Architecture
//!
//! ```text
//!   Scheduler (virtual or tokio)
//!        │ recurring timer per subscription
//!   ┌────▼──────┐
//!   │ BaseClock │  20 ms ticks
//!   └────┬──────┘
//!        │
//!   ┌────▼────────────┐   cache: Frequency -> Recipe
//!   │ TriggerProvider ├──────────────────────────────┐
//!   └────┬────────────┘                              │
//!        │ on_frequency()                            │
//!   ┌────▼────┐  subscribe()  ┌──────────────┐       │
//!   │ Trigger ├──────────────►│ Subscription │ Decimator (count to N)
//!   └─────────┘               └──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use triggers::{Frequency, TriggerProvider};
//!
//! let provider = TriggerProvider::with_tokio()?;
//! let subscription = provider
//!     .on_frequency(Frequency::At10Hz)?
//!     .subscribe(|_| do_something_ten_times_per_second())?;
//! ```

pub mod base_clock;
pub mod config;
pub mod decimator;
pub mod error;
pub mod logging;
pub mod provider;
pub mod trigger;

// Re-export main types
pub use base_clock::{BaseClock, TickStream};
pub use config::{ConfigError, TriggerConfig};
pub use decimator::Decimator;
pub use error::{TriggerError, TriggerResult};
pub use logging::{LoggingConfig, init_logging};
pub use provider::{TriggerProvider, TriggerSource};
pub use trigger::{Subscription, SubscriptionState, Trigger};

// Re-export the shared kernel for convenience
pub use triggers_clock::{TokioScheduler, VirtualScheduler};
pub use triggers_core::{Frequency, FrequencyError, Pulse};
pub use triggers_ports::{Scheduler, SchedulerError};
