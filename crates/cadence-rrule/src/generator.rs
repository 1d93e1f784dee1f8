//! Occurrence start generation.
//!
//! [`OccurrenceGenerator`] is the narrow capability a schedule needs from a
//! recurrence engine: a restartable, ordered stream of start instants and a
//! flag saying whether that stream ends. [`RRuleGenerator`] implements it on
//! top of the `rrule` crate.
//!
//! The engine is anchored at the anchor's *civil* reading in UTC, so it only
//! does calendar arithmetic on wall-clock values. Every civil candidate is
//! then resolved in the event zone, which keeps the wall-clock hour stable
//! across DST transitions and puts fold/gap handling under our policy rather
//! than the engine's.

use cadence_core::types::FoldPolicy;
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::{RRule, RRuleSet, Unvalidated};
use std::collections::BTreeSet;
use std::iter::Peekable;

use crate::error::RecurrenceResult;
use crate::rule::{Frequency, RecurrenceRule};
use crate::zone::{ZonedInstant, resolve_civil};

/// Candidates skipped in a row before an unbounded stream is considered
/// exhausted.
///
/// Only applies when neither COUNT nor UNTIL ends the rule, where an
/// exclusion rule matching every candidate would otherwise never yield.
/// Bounded rules always run to their end.
pub const MAX_CONSECUTIVE_SKIPS: usize = 100_000;

/// Boxed stream of start instants returned by [`OccurrenceGenerator::starts`].
pub type StartIter<'a> = Box<dyn Iterator<Item = DateTime<Tz>> + 'a>;

/// Source of occurrence start instants.
pub trait OccurrenceGenerator: Send + Sync {
    /// Ordered, de-duplicated start instants.
    ///
    /// Every call starts over from the first occurrence.
    fn starts(&self) -> StartIter<'_>;

    /// Whether [`starts`](Self::starts) eventually ends.
    fn is_bounded(&self) -> bool;
}

/// Rule cadence expanded by the `rrule` engine, resolved in the event zone.
#[derive(Debug, Clone)]
struct Cadence {
    set: RRuleSet,
    tz: Tz,
    fold: FoldPolicy,
    /// Emit both instants of a repeated civil time.
    sub_daily: bool,
    /// Anchor instant; sub-daily candidates before it are dropped.
    floor: DateTime<Utc>,
    count: Option<u32>,
    until: Option<DateTime<Utc>>,
}

impl Cadence {
    fn build(
        rule: &RecurrenceRule,
        anchor: &ZonedInstant,
        fold: FoldPolicy,
    ) -> RecurrenceResult<Self> {
        let text = rule.cadence_text();
        tracing::trace!(rrule = %text, anchor = %anchor, "Building rrule cadence");

        let rrule = text.parse::<RRule<Unvalidated>>()?;
        let dt_start = anchor.civil().and_utc().with_timezone(&rrule::Tz::UTC);
        let set = rrule.build(dt_start)?;

        Ok(Self {
            set,
            tz: anchor.timezone(),
            fold,
            sub_daily: matches!(
                rule.frequency(),
                Frequency::Secondly | Frequency::Minutely | Frequency::Hourly
            ),
            floor: anchor.instant(),
            count: rule.count(),
            until: rule.until(),
        })
    }

    /// Zone readings of one civil candidate, in instant order.
    fn resolve(&self, civil: NaiveDateTime) -> impl Iterator<Item = DateTime<Tz>> {
        match self.tz.from_local_datetime(&civil) {
            LocalResult::Ambiguous(first, second) if self.sub_daily => {
                let (earlier, later) = if first <= second {
                    (first, second)
                } else {
                    (second, first)
                };
                std::iter::once(earlier).chain(Some(later))
            }
            _ => std::iter::once(resolve_civil(civil, self.tz, self.fold).0).chain(None),
        }
    }

    /// Resolved candidates with COUNT and UNTIL applied, before exceptions.
    fn instants(&self) -> impl Iterator<Item = DateTime<Tz>> + '_ {
        let sub_daily = self.sub_daily;
        let floor = self.floor;
        let until = self.until;
        let limit = self
            .count
            .map_or(usize::MAX, |count| usize::try_from(count).unwrap_or(usize::MAX));
        let mut last: Option<DateTime<Tz>> = None;

        (&self.set)
            .into_iter()
            .flat_map(move |civil| self.resolve(civil.naive_utc()))
            // An anchor resolved to the later fold has an earlier reading before it
            .filter(move |instant| !sub_daily || instant.with_timezone(&Utc) >= floor)
            // Two civil candidates can land on one instant around a gap
            .filter(move |instant| {
                if last.is_some_and(|prev| *instant <= prev) {
                    return false;
                }
                last = Some(*instant);
                true
            })
            .take(limit)
            .take_while(move |instant| {
                until.is_none_or(|until| instant.with_timezone(&Utc) <= until)
            })
    }
}

/// [`OccurrenceGenerator`] backed by the `rrule` crate.
///
/// Count bounds the rule's own candidates and is consumed before exclusions,
/// as in RFC 5545: excluded occurrences are not backfilled. Added dates are
/// not subject to count or until. Excluded dates and the exclusion rule
/// suppress added dates as well as rule candidates.
#[derive(Debug, Clone)]
pub struct RRuleGenerator {
    anchor: DateTime<Tz>,
    cadence: Option<Cadence>,
    added: Vec<DateTime<Utc>>,
    excluded: BTreeSet<DateTime<Utc>>,
    exclusion: Option<Cadence>,
}

impl RRuleGenerator {
    /// ## Summary
    /// Prepares expansion of `rule` anchored at `anchor`.
    ///
    /// Without a rule the generator yields the anchor once.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::Engine` if the `rrule` crate rejects the
    /// rule or the anchor.
    pub fn new(
        anchor: &ZonedInstant,
        rule: Option<&RecurrenceRule>,
        fold: FoldPolicy,
    ) -> RecurrenceResult<Self> {
        let Some(rule) = rule else {
            return Ok(Self {
                anchor: anchor.zoned(),
                cadence: None,
                added: Vec::new(),
                excluded: BTreeSet::new(),
                exclusion: None,
            });
        };

        let cadence = Cadence::build(rule, anchor, fold)?;
        let exclusion = rule
            .exclusion_rule()
            .map(|exclusion| Cadence::build(exclusion, anchor, fold))
            .transpose()?;

        Ok(Self {
            anchor: anchor.zoned(),
            cadence: Some(cadence),
            added: rule.added_dates().iter().copied().collect(),
            excluded: rule.excluded_dates().clone(),
            exclusion,
        })
    }
}

impl OccurrenceGenerator for RRuleGenerator {
    fn starts(&self) -> StartIter<'_> {
        let rule: StartIter<'_> = match &self.cadence {
            Some(cadence) => Box::new(cadence.instants()),
            None => Box::new(std::iter::once(self.anchor)),
        };
        let exclusion = self
            .exclusion
            .as_ref()
            .map(|cadence| (Box::new(cadence.instants()) as StartIter<'_>).peekable());

        Box::new(Starts {
            rule: rule.peekable(),
            added: self.added.iter().peekable(),
            excluded: &self.excluded,
            exclusion,
            tz: self.anchor.timezone(),
            last: None,
            bounded: self.is_bounded(),
        })
    }

    fn is_bounded(&self) -> bool {
        self.cadence
            .as_ref()
            .is_none_or(|cadence| cadence.count.is_some() || cadence.until.is_some())
    }
}

/// Merge of rule candidates and added dates, minus exclusions.
struct Starts<'a> {
    rule: Peekable<StartIter<'a>>,
    added: Peekable<std::slice::Iter<'a, DateTime<Utc>>>,
    excluded: &'a BTreeSet<DateTime<Utc>>,
    exclusion: Option<Peekable<StartIter<'a>>>,
    tz: Tz,
    last: Option<DateTime<Utc>>,
    bounded: bool,
}

impl Starts<'_> {
    fn next_merged(&mut self) -> Option<DateTime<Tz>> {
        let from_rule = self.rule.peek().map(|dt| dt.with_timezone(&Utc));
        let from_added = self.added.peek().map(|dt| **dt);

        match (from_rule, from_added) {
            (Some(rule), Some(added)) if added < rule => {
                self.added.next();
                Some(added.with_timezone(&self.tz))
            }
            (Some(_), _) => self.rule.next(),
            (None, Some(added)) => {
                self.added.next();
                Some(added.with_timezone(&self.tz))
            }
            (None, None) => None,
        }
    }

    fn is_excluded(&mut self, instant: DateTime<Utc>) -> bool {
        if self.excluded.contains(&instant) {
            return true;
        }
        let Some(exclusion) = self.exclusion.as_mut() else {
            return false;
        };
        while exclusion
            .next_if(|candidate| candidate.with_timezone(&Utc) < instant)
            .is_some()
        {}
        exclusion
            .peek()
            .is_some_and(|candidate| candidate.with_timezone(&Utc) == instant)
    }
}

impl Iterator for Starts<'_> {
    type Item = DateTime<Tz>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut skipped = 0_usize;
        loop {
            let candidate = self.next_merged()?;
            let instant = candidate.with_timezone(&Utc);

            let duplicate = self.last.is_some_and(|prev| instant <= prev);
            if !duplicate {
                self.last = Some(instant);
                if !self.is_excluded(instant) {
                    return Some(candidate);
                }
                tracing::trace!(%candidate, "Occurrence excluded");
            }

            skipped += 1;
            if !self.bounded && skipped >= MAX_CONSECUTIVE_SKIPS {
                tracing::warn!(
                    skipped,
                    last = ?self.last,
                    "Every recent candidate was excluded, ending expansion"
                );
                return None;
            }
        }
    }
}
