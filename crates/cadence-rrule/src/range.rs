//! Range query policy: window bounds and the overlap predicate.

use cadence_core::types::FoldPolicy;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RecurrenceError, RecurrenceResult};
use crate::occurrence::TimeSpan;
use crate::zone::ZonedInstant;

/// One end of a query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// Start of that civil day in the event's zone.
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

impl RangeBound {
    /// ## Summary
    /// Resolves the bound to an instant using the event zone for dates.
    #[must_use]
    pub fn resolve(&self, tz: Tz, policy: FoldPolicy) -> DateTime<Utc> {
        match self {
            Self::Date(date) => ZonedInstant::start_of_day(*date, tz, policy).instant(),
            Self::Instant(instant) => *instant,
        }
    }
}

impl From<NaiveDate> for RangeBound {
    fn from(date: NaiveDate) -> Self {
        Self::Date(date)
    }
}

impl<T: TimeZone> From<DateTime<T>> for RangeBound {
    fn from(instant: DateTime<T>) -> Self {
        Self::Instant(instant.with_timezone(&Utc))
    }
}

impl From<ZonedInstant> for RangeBound {
    fn from(instant: ZonedInstant) -> Self {
        Self::Instant(instant.instant())
    }
}

/// Half-open query window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// ## Summary
    /// Builds a window; an empty window (`start == end`) is allowed.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidRange` if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RecurrenceResult<Self> {
        if end < start {
            return Err(RecurrenceError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Options for `Schedule::occurrences_between`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Also return occurrences that start before the window but are still
    /// running when it opens.
    pub spans: bool,
}

impl QueryOptions {
    #[must_use]
    pub fn spanning() -> Self {
        Self { spans: true }
    }
}

/// ## Summary
/// Whether `occurrence` belongs in the result for `window`.
///
/// Without `spans` the start must fall in `[window.start, window.end)`.
/// With `spans` an occurrence that starts earlier also matches when its end
/// is strictly after `window.start`.
#[must_use]
pub fn overlaps<S: TimeSpan>(occurrence: &S, window: &TimeWindow, spans: bool) -> bool {
    let start = occurrence.start_time().with_timezone(&Utc);
    if window.contains(start) {
        return true;
    }
    spans && start < window.start && occurrence.end_time().with_timezone(&Utc) > window.start
}
