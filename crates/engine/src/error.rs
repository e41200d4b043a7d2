//! Error types for the triggers engine

use thiserror::Error;
use triggers_core::FrequencyError;
use triggers_ports::SchedulerError;

use crate::config::ConfigError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(#[from] FrequencyError),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type TriggerResult<T> = std::result::Result<T, TriggerError>;
