use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Anything with a start and an end instant.
pub trait TimeSpan {
    fn start_time(&self) -> DateTime<Tz>;

    fn end_time(&self) -> DateTime<Tz>;

    fn duration(&self) -> TimeDelta {
        self.end_time() - self.start_time()
    }

    /// Half-open containment: `start <= instant < end`.
    fn contains<T: TimeZone>(&self, instant: &DateTime<T>) -> bool
    where
        Self: Sized,
    {
        let instant = instant.with_timezone(&Utc);
        self.start_time().with_timezone(&Utc) <= instant
            && instant < self.end_time().with_timezone(&Utc)
    }
}

/// One concrete instance of an event, rendered in the event's zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Occurrence {
    Timed {
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
    /// Spans whole civil days starting at `date`.
    AllDay {
        date: NaiveDate,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    },
}

impl Occurrence {
    #[must_use]
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay { .. })
    }

    /// Civil date the occurrence starts on, in the event's zone.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Timed { start, .. } => start.date_naive(),
            Self::AllDay { date, .. } => *date,
        }
    }
}

impl TimeSpan for Occurrence {
    fn start_time(&self) -> DateTime<Tz> {
        match self {
            Self::Timed { start, .. } | Self::AllDay { start, .. } => *start,
        }
    }

    fn end_time(&self) -> DateTime<Tz> {
        match self {
            Self::Timed { end, .. } | Self::AllDay { end, .. } => *end,
        }
    }
}

impl std::fmt::Display for Occurrence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timed { start, end } => {
                write!(f, "{} - {}", start.to_rfc3339(), end.to_rfc3339())
            }
            Self::AllDay { date, start, end } => {
                let days = (end.date_naive() - start.date_naive()).num_days();
                write!(f, "{date} (all day, {days}d)")
            }
        }
    }
}
