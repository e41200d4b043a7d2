use thiserror::Error;

/// Failures of the underlying scheduler
///
/// None of these are retried: a timer that receives one is finished.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Scheduler has been shut down")]
    ShutDown,

    #[error("Async runtime shut down while the timer was running")]
    RuntimeShutdown,

    #[error("No async runtime available on this thread")]
    NoRuntime,

    #[error("Timer interval must be greater than zero")]
    InvalidInterval,
}

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
