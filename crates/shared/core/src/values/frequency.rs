use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{FrequencyError, FrequencyResult};

/// Frequencies available for triggers
///
/// Each variant maps to a period in milliseconds. `Never` has no period and
/// denotes a trigger that never fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Frequency {
    Never,

    At50Hz,
    At25Hz,
    At10Hz,
    At5Hz,
    At2Hz,

    EverySecond,
    Every5Seconds,
    Every10Seconds,
    Every30Seconds,

    EveryMinute,
    Every5Minutes,
    Every10Minutes,
}

impl Frequency {
    /// Every frequency, in declaration order
    pub const ALL: [Frequency; 13] = [
        Frequency::Never,
        Frequency::At50Hz,
        Frequency::At25Hz,
        Frequency::At10Hz,
        Frequency::At5Hz,
        Frequency::At2Hz,
        Frequency::EverySecond,
        Frequency::Every5Seconds,
        Frequency::Every10Seconds,
        Frequency::Every30Seconds,
        Frequency::EveryMinute,
        Frequency::Every5Minutes,
        Frequency::Every10Minutes,
    ];

    /// Period in milliseconds (0 for `Never`)
    pub const fn period_ms(self) -> u64 {
        match self {
            Frequency::Never => 0,
            Frequency::At50Hz => 20,
            Frequency::At25Hz => 40,
            Frequency::At10Hz => 100,
            Frequency::At5Hz => 200,
            Frequency::At2Hz => 500,
            Frequency::EverySecond => 1_000,
            Frequency::Every5Seconds => 5_000,
            Frequency::Every10Seconds => 10_000,
            Frequency::Every30Seconds => 30_000,
            Frequency::EveryMinute => 60_000,
            Frequency::Every5Minutes => 300_000,
            Frequency::Every10Minutes => 600_000,
        }
    }

    /// Period between two pulses, `None` for `Never`
    pub fn period(self) -> Option<Duration> {
        match self {
            Frequency::Never => None,
            other => Some(Duration::from_millis(other.period_ms())),
        }
    }

    /// Returns true if this frequency never fires
    pub fn is_never(self) -> bool {
        matches!(self, Frequency::Never)
    }

    /// Nominal rate in hertz (0.0 for `Never`)
    pub fn hertz(self) -> f64 {
        match self.period_ms() {
            0 => 0.0,
            ms => 1_000.0 / ms as f64,
        }
    }

    /// Symbolic name, as used by `Display`, `FromStr` and serde
    pub const fn name(self) -> &'static str {
        match self {
            Frequency::Never => "Never",
            Frequency::At50Hz => "At50Hz",
            Frequency::At25Hz => "At25Hz",
            Frequency::At10Hz => "At10Hz",
            Frequency::At5Hz => "At5Hz",
            Frequency::At2Hz => "At2Hz",
            Frequency::EverySecond => "EverySecond",
            Frequency::Every5Seconds => "Every5Seconds",
            Frequency::Every10Seconds => "Every10Seconds",
            Frequency::Every30Seconds => "Every30Seconds",
            Frequency::EveryMinute => "EveryMinute",
            Frequency::Every5Minutes => "Every5Minutes",
            Frequency::Every10Minutes => "Every10Minutes",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u64> for Frequency {
    type Error = FrequencyError;

    /// Resolve a raw period in milliseconds
    fn try_from(period_ms: u64) -> FrequencyResult<Self> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.period_ms() == period_ms)
            .ok_or(FrequencyError::UnknownPeriod(period_ms))
    }
}

impl FromStr for Frequency {
    type Err = FrequencyError;

    fn from_str(s: &str) -> FrequencyResult<Self> {
        Frequency::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| FrequencyError::UnknownName(s.to_string()))
    }
}
