//! The base event a schedule expands.

use cadence_core::constants::MAX_EVENT_DURATION_SECONDS;
use cadence_core::types::FoldPolicy;
use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RecurrenceError, RecurrenceResult};
use crate::rule::RecurrenceRule;
use crate::zone::ZonedInstant;

/// How the end of the base event was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEnd {
    /// Neither end nor duration; the schedule's configured default applies.
    Unspecified,
    At(DateTime<Utc>),
    Duration(TimeDelta),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Timed,
    /// Covers `days` whole civil days from the anchor date.
    AllDay { days: u32 },
}

/// Anchor, extent, and optional recurrence rule of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    start: ZonedInstant,
    end: EventEnd,
    kind: EventKind,
    rule: Option<RecurrenceRule>,
}

impl Event {
    /// ## Summary
    /// A timed event anchored at `start` with no end and no rule.
    #[must_use]
    pub fn new(start: ZonedInstant) -> Self {
        Self {
            start,
            end: EventEnd::Unspecified,
            kind: EventKind::Timed,
            rule: None,
        }
    }

    /// ## Summary
    /// An all-day event covering one civil day in `tz`.
    ///
    /// Where midnight of `date` occurs twice, the anchor is provisional until
    /// a schedule re-resolves it with its configured fold policy.
    #[must_use]
    pub fn all_day(date: NaiveDate, tz: Tz) -> Self {
        Self {
            start: ZonedInstant::start_of_day(date, tz, FoldPolicy::default()),
            end: EventEnd::Unspecified,
            kind: EventKind::AllDay { days: 1 },
            rule: None,
        }
    }

    /// ## Summary
    /// Re-resolves an all-day anchor's midnight under `policy`.
    ///
    /// Timed anchors keep the resolution they were built with.
    #[must_use]
    pub fn with_fold_policy(mut self, policy: FoldPolicy) -> Self {
        if self.is_all_day() {
            self.start =
                ZonedInstant::start_of_day(self.start.civil().date(), self.timezone(), policy);
        }
        self
    }

    /// Sets the number of civil days an all-day event covers. No effect on timed events.
    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        if let EventKind::AllDay { .. } = self.kind {
            self.kind = EventKind::AllDay { days };
        }
        self
    }

    #[must_use]
    pub fn with_end<T: TimeZone>(mut self, end: &DateTime<T>) -> Self {
        self.end = EventEnd::At(end.with_timezone(&Utc));
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: TimeDelta) -> Self {
        self.end = EventEnd::Duration(duration);
        self
    }

    /// Drops any end or duration so the configured default applies.
    #[must_use]
    pub fn without_end(mut self) -> Self {
        self.end = EventEnd::Unspecified;
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.rule = Some(rule);
        self
    }

    #[must_use]
    pub fn start(&self) -> &ZonedInstant {
        &self.start
    }

    #[must_use]
    pub fn end(&self) -> EventEnd {
        self.end
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub fn is_all_day(&self) -> bool {
        matches!(self.kind, EventKind::AllDay { .. })
    }

    #[must_use]
    pub fn rule(&self) -> Option<&RecurrenceRule> {
        self.rule.as_ref()
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.start.timezone()
    }

    /// ## Summary
    /// Duration of each occurrence, falling back to `default` when the event
    /// gives neither an end nor a duration.
    ///
    /// All-day events report their nominal length in days.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidEvent` if the end precedes the start,
    /// the duration is negative or longer than `MAX_EVENT_DURATION_SECONDS`,
    /// or an all-day event covers zero days.
    pub fn resolve_duration(&self, default: TimeDelta) -> RecurrenceResult<TimeDelta> {
        let duration = match (self.kind, self.end) {
            (EventKind::AllDay { days: 0 }, _) => {
                return Err(RecurrenceError::InvalidEvent(
                    "an all-day event must cover at least one day".to_string(),
                ));
            }
            (EventKind::AllDay { days }, _) => TimeDelta::try_days(i64::from(days))
                .unwrap_or(TimeDelta::MAX),
            (EventKind::Timed, EventEnd::Unspecified) => default,
            (EventKind::Timed, EventEnd::At(end)) => end - self.start.instant(),
            (EventKind::Timed, EventEnd::Duration(duration)) => duration,
        };

        if duration < TimeDelta::zero() {
            return Err(RecurrenceError::InvalidEvent(format!(
                "event ends before it starts (duration {duration})"
            )));
        }
        if duration.num_seconds() > MAX_EVENT_DURATION_SECONDS {
            return Err(RecurrenceError::InvalidEvent(format!(
                "event lasts {} seconds, more than the {MAX_EVENT_DURATION_SECONDS} allowed",
                duration.num_seconds()
            )));
        }
        Ok(duration)
    }
}
