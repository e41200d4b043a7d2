use chrono::{DateTime, Utc};

mod frequency;
mod pulse;

pub use frequency::Frequency;
pub use pulse::Pulse;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
