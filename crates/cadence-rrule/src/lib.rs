//! Recurring calendar event expansion.
//!
//! Builds concrete occurrences from an [`Event`] carrying an optional
//! [`RecurrenceRule`], and answers range queries over them through
//! [`Schedule`].

#[cfg(test)]
extern crate self as cadence_rrule;

pub mod error;
pub mod event;
pub mod generator;
pub mod occurrence;
pub mod range;
pub mod rule;
pub mod schedule;
pub mod zone;

pub use error::{RecurrenceError, RecurrenceResult};
pub use event::{Event, EventEnd, EventKind};
pub use generator::{OccurrenceGenerator, RRuleGenerator};
pub use occurrence::{Occurrence, TimeSpan};
pub use range::{QueryOptions, RangeBound, TimeWindow};
pub use rule::{
    ByRules, Frequency, RecurrenceRule, RecurrenceRuleBuilder, Termination, WeekdayNum,
};
pub use schedule::Schedule;
pub use zone::{Resolution, TimeZoneResolver, ZonedInstant};
