use thiserror::Error;

/// Errors raised when resolving a frequency from an external representation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrequencyError {
    #[error("No frequency has a period of {0} ms")]
    UnknownPeriod(u64),

    #[error("Unknown frequency name: {0}")]
    UnknownName(String),
}

pub type FrequencyResult<T> = std::result::Result<T, FrequencyError>;
