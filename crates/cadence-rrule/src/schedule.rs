//! Occurrence queries over one event.
//!
//! A [`Schedule`] takes ownership of an [`Event`] and answers queries about
//! its occurrences. The event is a snapshot: the schedule never observes
//! later changes because the caller no longer holds it. Build a new schedule
//! to expand a modified event.

use cadence_core::config::ScheduleConfig;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{RecurrenceError, RecurrenceResult};
use crate::event::{Event, EventKind};
use crate::generator::{OccurrenceGenerator, RRuleGenerator};
use crate::occurrence::{Occurrence, TimeSpan};
use crate::range::{QueryOptions, RangeBound, TimeWindow, overlaps};
use crate::zone::ZonedInstant;

/// Recurring event expansion and range queries.
#[derive(Debug, Clone)]
pub struct Schedule<G = RRuleGenerator> {
    event: Event,
    generator: G,
    duration: TimeDelta,
    config: ScheduleConfig,
}

impl Schedule<RRuleGenerator> {
    /// ## Summary
    /// Builds a schedule with the default configuration.
    ///
    /// ## Errors
    /// Returns an error if the event's rule is rejected by the recurrence
    /// engine or the event's end precedes its start.
    pub fn new(event: Event) -> RecurrenceResult<Self> {
        Self::with_config(event, &ScheduleConfig::default())
    }

    /// ## Summary
    /// Builds a schedule with an explicit configuration.
    ///
    /// ## Errors
    /// Returns an error if the configuration is invalid, the event's rule is
    /// rejected by the recurrence engine, or the event's end precedes its start.
    pub fn with_config(event: Event, config: &ScheduleConfig) -> RecurrenceResult<Self> {
        config.validate()?;
        let event = event.with_fold_policy(config.fold_policy);
        let generator = RRuleGenerator::new(event.start(), event.rule(), config.fold_policy)?;
        Self::with_generator(event, generator, config)
    }
}

impl<G: OccurrenceGenerator> Schedule<G> {
    /// ## Summary
    /// Builds a schedule around a caller-supplied generator.
    ///
    /// ## Errors
    /// Returns an error if the configuration is invalid, the event's end
    /// precedes its start, or its duration exceeds `MAX_EVENT_DURATION_SECONDS`.
    pub fn with_generator(
        event: Event,
        generator: G,
        config: &ScheduleConfig,
    ) -> RecurrenceResult<Self> {
        config.validate()?;
        let event = event.with_fold_policy(config.fold_policy);
        let duration = event.resolve_duration(config.default_duration())?;

        tracing::debug!(
            start = %event.start(),
            duration_seconds = duration.num_seconds(),
            rule = ?event.rule().map(ToString::to_string),
            bounded = generator.is_bounded(),
            "Schedule created"
        );

        Ok(Self {
            event,
            generator,
            duration,
            config: config.clone(),
        })
    }

    #[must_use]
    pub fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Anchor of the underlying event.
    #[must_use]
    pub fn start_time(&self) -> DateTime<Tz> {
        self.event.start().zoned()
    }

    /// End of the first occurrence: the event's own end, or start plus duration.
    #[must_use]
    pub fn end_time(&self) -> DateTime<Tz> {
        self.occurrence_at(self.start_time()).end_time()
    }

    /// Length of every timed occurrence; nominal length for all-day events.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.generator.is_bounded()
    }

    /// ## Summary
    /// Lazily yields occurrences in ascending start order.
    ///
    /// Unbounded rules produce an endless iterator; bound it with `take`,
    /// `take_while` or a range query.
    pub fn occurrences(&self) -> impl Iterator<Item = Occurrence> + '_ {
        self.generator
            .starts()
            .map(move |start| self.occurrence_at(start))
    }

    /// ## Summary
    /// Materializes every occurrence.
    ///
    /// ## Errors
    /// - `RecurrenceError::UnboundedExpansion` if the rule has no COUNT or UNTIL
    /// - `RecurrenceError::ExpansionLimit` if more than `max_occurrences`
    ///   occurrences would be produced
    pub fn all_occurrences(&self) -> RecurrenceResult<Vec<Occurrence>> {
        if !self.is_bounded() {
            return Err(RecurrenceError::UnboundedExpansion);
        }

        let limit = self.config.max_occurrences;
        let occurrences: Vec<Occurrence> =
            self.occurrences().take(limit.saturating_add(1)).collect();
        if occurrences.len() > limit {
            tracing::warn!(limit, "Occurrence expansion exceeded the configured limit");
            return Err(RecurrenceError::ExpansionLimit { limit });
        }

        tracing::debug!(count = occurrences.len(), "Materialized all occurrences");
        Ok(occurrences)
    }

    /// ## Summary
    /// Occurrences whose start falls in `[range_start, range_end)`; with
    /// `options.spans`, also those that started earlier and are still running
    /// at `range_start`.
    ///
    /// Date bounds mean civil midnight in the event's zone.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidRange` if `range_end` is before `range_start`.
    pub fn occurrences_between(
        &self,
        range_start: impl Into<RangeBound>,
        range_end: impl Into<RangeBound>,
        options: QueryOptions,
    ) -> RecurrenceResult<Vec<Occurrence>> {
        let tz = self.event.timezone();
        let fold = self.config.fold_policy;
        let window = TimeWindow::new(
            range_start.into().resolve(tz, fold),
            range_end.into().resolve(tz, fold),
        )?;

        let found: Vec<Occurrence> = self
            .occurrences()
            .take_while(|occurrence| occurrence.start_time().with_timezone(&Utc) < window.end())
            .filter(|occurrence| overlaps(occurrence, &window, options.spans))
            .collect();

        tracing::debug!(
            window_start = %window.start(),
            window_end = %window.end(),
            spans = options.spans,
            count = found.len(),
            "Range query completed"
        );
        Ok(found)
    }

    /// ## Summary
    /// Whether an occurrence starts exactly at `instant`.
    #[must_use]
    pub fn occurs_at<T: TimeZone>(&self, instant: &DateTime<T>) -> bool {
        let instant = instant.with_timezone(&Utc);
        self.generator
            .starts()
            .map(|start| start.with_timezone(&Utc))
            .take_while(|start| *start <= instant)
            .any(|start| start == instant)
    }

    /// ## Summary
    /// Whether some occurrence is in progress at `instant`.
    ///
    /// Occurrences are half-open `[start, end)`. Zero-length occurrences
    /// count only at their exact start.
    #[must_use]
    pub fn occurring_at<T: TimeZone>(&self, instant: &DateTime<T>) -> bool {
        if self.duration.is_zero() {
            return self.occurs_at(instant);
        }
        let instant = instant.with_timezone(&Utc);
        self.occurrences()
            .take_while(|occurrence| occurrence.start_time().with_timezone(&Utc) <= instant)
            .any(|occurrence| occurrence.contains(&instant))
    }

    /// ## Summary
    /// Up to `n` occurrences starting strictly after `after`.
    #[must_use]
    pub fn next_occurrences<T: TimeZone>(&self, n: usize, after: &DateTime<T>) -> Vec<Occurrence> {
        let after = after.with_timezone(&Utc);
        self.occurrences()
            .skip_while(|occurrence| occurrence.start_time().with_timezone(&Utc) <= after)
            .take(n)
            .collect()
    }

    #[must_use]
    pub fn next_occurrence<T: TimeZone>(&self, after: &DateTime<T>) -> Option<Occurrence> {
        self.next_occurrences(1, after).into_iter().next()
    }

    /// Ends that fall past the last representable instant collapse onto the
    /// start.
    fn occurrence_at(&self, start: DateTime<Tz>) -> Occurrence {
        let end_by_duration = || {
            start.checked_add_signed(self.duration).unwrap_or_else(|| {
                tracing::warn!(%start, "Occurrence end out of range, using its start");
                start
            })
        };
        match self.event.kind() {
            EventKind::Timed => Occurrence::Timed {
                start,
                end: end_by_duration(),
            },
            EventKind::AllDay { days } => {
                let date = start.date_naive();
                let end = date
                    .checked_add_days(chrono::Days::new(u64::from(days)))
                    .map_or_else(end_by_duration, |last| {
                        ZonedInstant::start_of_day(last, start.timezone(), self.config.fold_policy)
                            .zoned()
                    });
                Occurrence::AllDay { date, start, end }
            }
        }
    }
}
