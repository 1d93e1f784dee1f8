use chrono::{DateTime, Utc};
use thiserror::Error;

/// Recurrence expansion and validation errors
#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error("Unbounded expansion: the recurrence rule has neither COUNT nor UNTIL")]
    UnboundedExpansion,

    #[error("Expansion limit exceeded: more than {limit} occurrences")]
    ExpansionLimit { limit: usize },

    #[error("Invalid range: end {end} is before start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("RRule engine error: {0}")]
    Engine(#[from] rrule::RRuleError),

    #[error(transparent)]
    Core(#[from] cadence_core::error::CoreError),
}

pub type RecurrenceResult<T> = std::result::Result<T, RecurrenceError>;
