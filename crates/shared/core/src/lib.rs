//! Triggers Core
//!
//! Pure value types for the triggers frequency engine.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod error;
pub mod values;

// Re-export commonly used types at crate root
pub use error::{FrequencyError, FrequencyResult};
pub use values::{Frequency, Pulse, Timestamp};
