//! Zone-aware instants and timezone identifier resolution.
//!
//! A [`ZonedInstant`] pairs the civil reading a caller supplied with the one
//! absolute instant it denotes in a named zone. DST edges never fail:
//!
//! - **Fold** (the civil time occurs twice): the [`FoldPolicy`] decides. The
//!   default, [`FoldPolicy::Later`], takes the post-transition offset.
//! - **Gap** (the civil time never occurs): the reading moves forward to the
//!   first valid civil time, which is the instant of the transition itself.
//!   02:30 on a US spring-forward day becomes 03:00 local.
//!
//! Uses ICU4X for Windows timezone ID to IANA mapping and timezone canonicalization.

use cadence_core::types::FoldPolicy;
use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use icu::time::zone::WindowsParser;
use icu::time::zone::iana::IanaParserExtended;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{RecurrenceError, RecurrenceResult};

/// How a civil reading was mapped onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The civil time occurs exactly once.
    Exact,
    /// The civil time occurs twice; the fold policy picked one.
    Folded,
    /// The civil time does not exist; it was moved to the end of the gap.
    Shifted,
}

/// A civil date-time in a named zone, resolved to a single instant.
///
/// Equality, ordering and hashing go through the absolute instant, so two
/// values written in different zones compare equal when they denote the same
/// moment.
#[derive(Debug, Clone, Copy)]
pub struct ZonedInstant {
    civil: NaiveDateTime,
    zoned: DateTime<Tz>,
    resolution: Resolution,
}

impl ZonedInstant {
    /// ## Summary
    /// Resolves a civil reading in `tz` using the default fold policy.
    #[must_use]
    pub fn new(civil: NaiveDateTime, tz: Tz) -> Self {
        Self::from_civil(civil, tz, FoldPolicy::default())
    }

    /// ## Summary
    /// Resolves a civil reading in `tz` with an explicit fold policy.
    #[must_use]
    pub fn from_civil(civil: NaiveDateTime, tz: Tz, policy: FoldPolicy) -> Self {
        let (zoned, resolution) = resolve_civil(civil, tz, policy);
        Self {
            civil,
            zoned,
            resolution,
        }
    }

    /// ## Summary
    /// Builds a value from an absolute instant, reading its civil time in `tz`.
    #[must_use]
    pub fn from_instant<T: TimeZone>(instant: &DateTime<T>, tz: Tz) -> Self {
        let zoned = instant.with_timezone(&tz);
        Self {
            civil: zoned.naive_local(),
            zoned,
            resolution: Resolution::Exact,
        }
    }

    /// ## Summary
    /// Resolves civil midnight of `date` in `tz`.
    ///
    /// Zones that skip midnight (a gap at 00:00) resolve to the first valid
    /// time of that day.
    #[must_use]
    pub fn start_of_day(date: NaiveDate, tz: Tz, policy: FoldPolicy) -> Self {
        Self::from_civil(date.and_time(chrono::NaiveTime::MIN), tz, policy)
    }

    /// ## Summary
    /// Convenience constructor from civil components.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidEvent` if the components do not form a
    /// valid calendar date and time of day.
    pub fn from_ymd_hms(
        tz: Tz,
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> RecurrenceResult<Self> {
        let civil = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                RecurrenceError::InvalidEvent(format!(
                    "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02} is not a valid civil time"
                ))
            })?;
        Ok(Self::new(civil, tz))
    }

    /// The civil reading as supplied (before any gap shift).
    #[must_use]
    pub fn civil(&self) -> NaiveDateTime {
        self.civil
    }

    /// The resolved instant rendered in the zone.
    #[must_use]
    pub fn zoned(&self) -> DateTime<Tz> {
        self.zoned
    }

    #[must_use]
    pub fn instant(&self) -> DateTime<Utc> {
        self.zoned.with_timezone(&Utc)
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.zoned.timezone()
    }

    /// UTC offset in effect at the resolved instant, in seconds east of UTC.
    #[must_use]
    pub fn offset_seconds(&self) -> i32 {
        self.zoned.offset().fix().local_minus_utc()
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl PartialEq for ZonedInstant {
    fn eq(&self, other: &Self) -> bool {
        self.zoned == other.zoned
    }
}

impl Eq for ZonedInstant {}

impl PartialOrd for ZonedInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZonedInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.zoned.cmp(&other.zoned)
    }
}

impl Hash for ZonedInstant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant().hash(state);
    }
}

impl std::fmt::Display for ZonedInstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.zoned.to_rfc3339(), self.timezone())
    }
}

/// ## Summary
/// Maps a civil reading in `tz` onto exactly one instant.
///
/// Folds are settled by `policy`; gaps resolve to the transition instant.
#[must_use]
pub fn resolve_civil(
    civil: NaiveDateTime,
    tz: Tz,
    policy: FoldPolicy,
) -> (DateTime<Tz>, Resolution) {
    match tz.from_local_datetime(&civil) {
        LocalResult::Single(dt) => (dt, Resolution::Exact),
        LocalResult::Ambiguous(first, second) => {
            let (earlier, later) = if first <= second {
                (first, second)
            } else {
                (second, first)
            };
            let chosen = match policy {
                FoldPolicy::Earlier => earlier,
                FoldPolicy::Later => later,
            };
            tracing::trace!(
                %civil,
                %tz,
                %policy,
                resolved = %chosen,
                "Civil time falls in a DST fold"
            );
            (chosen, Resolution::Folded)
        }
        LocalResult::None => {
            let shifted = gap_end(civil, tz);
            tracing::debug!(
                %civil,
                %tz,
                resolved = %shifted,
                "Civil time falls in a DST gap, shifted forward"
            );
            (shifted, Resolution::Shifted)
        }
    }
}

fn offset_seconds_at(tz: Tz, utc: DateTime<Utc>) -> i32 {
    tz.offset_from_utc_datetime(&utc.naive_utc())
        .fix()
        .local_minus_utc()
}

/// First instant after the gap containing `civil`.
///
/// With `before`/`after` the offsets on either side, the transition `T`
/// satisfies `T + before <= civil < T + after`, which brackets `T` for a
/// binary search at one-second resolution.
fn gap_end(civil: NaiveDateTime, tz: Tz) -> DateTime<Tz> {
    let as_utc = civil.and_utc();
    let before = offset_seconds_at(tz, as_utc - TimeDelta::days(1));
    let after = offset_seconds_at(tz, as_utc + TimeDelta::days(1));

    let mut lo = as_utc - TimeDelta::seconds(i64::from(after));
    let mut hi = as_utc - TimeDelta::seconds(i64::from(before));

    while hi - lo > TimeDelta::seconds(1) {
        let mid = lo + (hi - lo) / 2;
        if offset_seconds_at(tz, mid) == before {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    hi.with_timezone(&tz)
}

/// Resolver for timezone identifiers.
///
/// Maintains a cache of resolved timezones keyed by the identifier as given.
pub struct TimeZoneResolver {
    cache: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    /// Creates a new timezone resolver.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// ## Summary
    /// Resolves a timezone identifier to a `chrono_tz::Tz`.
    ///
    /// Accepts IANA names and aliases, Windows zone names, and the
    /// `/mozilla.org/` style prefixes some calendar clients emit.
    ///
    /// ## Errors
    ///
    /// Returns `RecurrenceError::UnknownTimezone` if the TZID cannot be resolved.
    ///
    /// ## Side Effects
    ///
    /// Caches successful resolutions to avoid repeated parsing.
    pub fn resolve(&mut self, tzid: &str) -> RecurrenceResult<Tz> {
        if let Some(tz) = self.cache.get(tzid) {
            return Ok(*tz);
        }

        let normalized = normalize_tzid(tzid);

        let tz = Tz::from_str(&normalized)
            .map_err(|_e| RecurrenceError::UnknownTimezone(tzid.to_string()))?;

        tracing::trace!(tzid, resolved = %tz, "Resolved timezone identifier");
        self.cache.insert(tzid.to_string(), tz);

        Ok(tz)
    }

    /// ## Summary
    /// Resolves `tzid` and then a civil reading within it.
    ///
    /// ## Errors
    ///
    /// Returns `RecurrenceError::UnknownTimezone` if the TZID cannot be resolved.
    pub fn zoned(
        &mut self,
        civil: NaiveDateTime,
        tzid: &str,
        policy: FoldPolicy,
    ) -> RecurrenceResult<ZonedInstant> {
        let tz = self.resolve(tzid)?;
        Ok(ZonedInstant::from_civil(civil, tz, policy))
    }
}

impl Default for TimeZoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalizes common calendar-client timezone identifiers to IANA names.
fn normalize_tzid(tzid: &str) -> String {
    let stripped = tzid
        .strip_prefix("/mozilla.org/")
        .or_else(|| tzid.strip_prefix("/softwarestudio.org/"))
        .unwrap_or(tzid);

    let windows_parser = WindowsParser::new();
    if let Some(tz) = windows_parser.parse(stripped, None) {
        let iana_parser = IanaParserExtended::new();
        for entry in iana_parser.iter() {
            if entry.time_zone == tz {
                return entry.canonical.to_string();
            }
        }
    }

    // Canonicalizes aliases like Europe/Kiev -> Europe/Kyiv
    let iana_parser = IanaParserExtended::new();
    let parsed = iana_parser.parse(stripped);
    if parsed.time_zone != icu::time::TimeZone::UNKNOWN {
        return parsed.canonical.to_string();
    }

    stripped.to_string()
}
