//! Structured recurrence rules.
//!
//! A [`RecurrenceRule`] is the already-parsed form of an RRULE together with
//! the exception lists that travel with it (RDATE, EXDATE, and an optional
//! EXRULE). Shape problems are reported when the rule is built, never later
//! during expansion.

use chrono::{DateTime, TimeZone, Utc, Weekday};
use std::collections::BTreeSet;

use crate::error::{RecurrenceError, RecurrenceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Ok(Self::Secondly),
            "MINUTELY" => Ok(Self::Minutely),
            "HOURLY" => Ok(Self::Hourly),
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "YEARLY" => Ok(Self::Yearly),
            other => Err(RecurrenceError::InvalidRule(format!(
                "unknown frequency `{other}`"
            ))),
        }
    }
}

/// A BYDAY entry: a weekday, optionally with an ordinal (`2MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    pub ordinal: Option<i16>,
    pub weekday: Weekday,
}

impl WeekdayNum {
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    #[must_use]
    pub const fn nth(ordinal: i16, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl From<Weekday> for WeekdayNum {
    fn from(weekday: Weekday) -> Self {
        Self::every(weekday)
    }
}

impl std::fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ordinal) = self.ordinal {
            write!(f, "{ordinal}")?;
        }
        f.write_str(weekday_code(self.weekday))
    }
}

const fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// BYxxx constraints of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByRules {
    pub seconds: Vec<u8>,
    pub minutes: Vec<u8>,
    pub hours: Vec<u8>,
    pub weekdays: Vec<WeekdayNum>,
    pub month_days: Vec<i8>,
    pub year_days: Vec<i16>,
    pub week_numbers: Vec<i8>,
    pub months: Vec<u8>,
    pub set_positions: Vec<i32>,
    pub week_start: Option<Weekday>,
}

impl ByRules {
    /// True when no BYxxx list is set. `week_start` alone does not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
            && self.minutes.is_empty()
            && self.hours.is_empty()
            && self.weekdays.is_empty()
            && self.month_days.is_empty()
            && self.year_days.is_empty()
            && self.week_numbers.is_empty()
            && self.months.is_empty()
    }

    /// ## Summary
    /// Checks value ranges and frequency compatibility.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidRule` naming the first offending part.
    pub fn validate(&self, frequency: Frequency) -> RecurrenceResult<()> {
        check_range("BYSECOND", &self.seconds, |v| *v <= 59)?;
        check_range("BYMINUTE", &self.minutes, |v| *v <= 59)?;
        check_range("BYHOUR", &self.hours, |v| *v <= 23)?;
        check_range("BYMONTHDAY", &self.month_days, |v| {
            *v != 0 && v.unsigned_abs() <= 31
        })?;
        check_range("BYYEARDAY", &self.year_days, |v| {
            *v != 0 && v.unsigned_abs() <= 366
        })?;
        check_range("BYWEEKNO", &self.week_numbers, |v| {
            *v != 0 && v.unsigned_abs() <= 53
        })?;
        check_range("BYMONTH", &self.months, |v| (1..=12).contains(v))?;
        check_range("BYSETPOS", &self.set_positions, |v| {
            *v != 0 && v.unsigned_abs() <= 366
        })?;

        if !self.month_days.is_empty() && frequency == Frequency::Weekly {
            return Err(incompatible("BYMONTHDAY", frequency));
        }
        if !self.year_days.is_empty()
            && matches!(
                frequency,
                Frequency::Daily | Frequency::Weekly | Frequency::Monthly
            )
        {
            return Err(incompatible("BYYEARDAY", frequency));
        }
        if !self.week_numbers.is_empty() && frequency != Frequency::Yearly {
            return Err(incompatible("BYWEEKNO", frequency));
        }

        for day in &self.weekdays {
            let Some(ordinal) = day.ordinal else {
                continue;
            };
            let limit = match frequency {
                Frequency::Monthly => 5,
                Frequency::Yearly if self.week_numbers.is_empty() => 53,
                _ => {
                    return Err(RecurrenceError::InvalidRule(format!(
                        "BYDAY ordinal `{day}` is only valid with FREQ=MONTHLY or FREQ=YEARLY without BYWEEKNO"
                    )));
                }
            };
            if ordinal == 0 || ordinal.unsigned_abs() > limit {
                return Err(RecurrenceError::InvalidRule(format!(
                    "BYDAY ordinal `{day}` is out of range for FREQ={frequency}"
                )));
            }
        }

        if !self.set_positions.is_empty() && self.is_empty() {
            return Err(RecurrenceError::InvalidRule(
                "BYSETPOS requires another BYxxx part".to_string(),
            ));
        }

        Ok(())
    }

    fn write_rrule(&self, out: &mut String) {
        push_list(out, "BYMONTH", &self.months);
        push_list(out, "BYWEEKNO", &self.week_numbers);
        push_list(out, "BYYEARDAY", &self.year_days);
        push_list(out, "BYMONTHDAY", &self.month_days);
        push_list(out, "BYDAY", &self.weekdays);
        push_list(out, "BYHOUR", &self.hours);
        push_list(out, "BYMINUTE", &self.minutes);
        push_list(out, "BYSECOND", &self.seconds);
        push_list(out, "BYSETPOS", &self.set_positions);
        if let Some(week_start) = self.week_start {
            out.push_str(";WKST=");
            out.push_str(weekday_code(week_start));
        }
    }
}

fn check_range<T: std::fmt::Display>(
    part: &str,
    values: &[T],
    valid: impl Fn(&T) -> bool,
) -> RecurrenceResult<()> {
    match values.iter().find(|v| !valid(v)) {
        Some(bad) => Err(RecurrenceError::InvalidRule(format!(
            "{part} value `{bad}` is out of range"
        ))),
        None => Ok(()),
    }
}

fn incompatible(part: &str, frequency: Frequency) -> RecurrenceError {
    RecurrenceError::InvalidRule(format!("{part} is not valid with FREQ={frequency}"))
}

fn push_list<T: std::fmt::Display>(out: &mut String, part: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    out.push(';');
    out.push_str(part);
    out.push('=');
    out.push_str(&joined);
}

/// How a rule ends. COUNT and UNTIL are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Number of rule-generated candidates, counted before exclusions.
    Count(u32),
    /// Inclusive upper bound on candidate start instants.
    Until(DateTime<Utc>),
}

/// A validated recurrence rule with its exception lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    frequency: Frequency,
    interval: u16,
    termination: Option<Termination>,
    by: ByRules,
    added: BTreeSet<DateTime<Utc>>,
    excluded: BTreeSet<DateTime<Utc>>,
    exclusion_rule: Option<Box<RecurrenceRule>>,
}

impl RecurrenceRule {
    #[must_use]
    pub fn builder(frequency: Frequency) -> RecurrenceRuleBuilder {
        RecurrenceRuleBuilder::new(frequency)
    }

    #[must_use]
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    #[must_use]
    pub fn interval(&self) -> u16 {
        self.interval
    }

    #[must_use]
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    #[must_use]
    pub fn count(&self) -> Option<u32> {
        match self.termination {
            Some(Termination::Count(count)) => Some(count),
            _ => None,
        }
    }

    #[must_use]
    pub fn until(&self) -> Option<DateTime<Utc>> {
        match self.termination {
            Some(Termination::Until(until)) => Some(until),
            _ => None,
        }
    }

    #[must_use]
    pub fn by(&self) -> &ByRules {
        &self.by
    }

    /// Explicit extra occurrence starts (RDATE), normalized to UTC.
    #[must_use]
    pub fn added_dates(&self) -> &BTreeSet<DateTime<Utc>> {
        &self.added
    }

    /// Explicit suppressed occurrence starts (EXDATE), normalized to UTC.
    #[must_use]
    pub fn excluded_dates(&self) -> &BTreeSet<DateTime<Utc>> {
        &self.excluded
    }

    #[must_use]
    pub fn exclusion_rule(&self) -> Option<&RecurrenceRule> {
        self.exclusion_rule.as_deref()
    }

    #[must_use]
    pub fn is_bounded(&self) -> bool {
        self.termination.is_some()
    }

    /// ## Summary
    /// Renders FREQ, INTERVAL and the BYxxx parts as RRULE text.
    ///
    /// COUNT and UNTIL are left out; the generator applies them itself on
    /// resolved instants.
    #[must_use]
    pub fn cadence_text(&self) -> String {
        let mut out = format!("FREQ={};INTERVAL={}", self.frequency, self.interval);
        self.by.write_rrule(&mut out);
        out
    }
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cadence_text())?;
        match self.termination {
            Some(Termination::Count(count)) => write!(f, ";COUNT={count}"),
            Some(Termination::Until(until)) => {
                write!(f, ";UNTIL={}", until.format("%Y%m%dT%H%M%SZ"))
            }
            None => Ok(()),
        }
    }
}

/// Builder for [`RecurrenceRule`]; mirrors the fields an RRULE parser yields.
#[derive(Debug, Clone)]
pub struct RecurrenceRuleBuilder {
    frequency: Frequency,
    interval: u16,
    count: Option<u32>,
    until: Option<DateTime<Utc>>,
    by: ByRules,
    added: BTreeSet<DateTime<Utc>>,
    excluded: BTreeSet<DateTime<Utc>>,
    exclusion_rule: Option<RecurrenceRule>,
}

impl RecurrenceRuleBuilder {
    #[must_use]
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by: ByRules::default(),
            added: BTreeSet::new(),
            excluded: BTreeSet::new(),
            exclusion_rule: None,
        }
    }

    #[must_use]
    pub fn interval(mut self, interval: u16) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn until<T: TimeZone>(mut self, until: &DateTime<T>) -> Self {
        self.until = Some(until.with_timezone(&Utc));
        self
    }

    #[must_use]
    pub fn by_rules(mut self, by: ByRules) -> Self {
        self.by = by;
        self
    }

    #[must_use]
    pub fn by_weekday(mut self, days: impl IntoIterator<Item = WeekdayNum>) -> Self {
        self.by.weekdays.extend(days);
        self
    }

    #[must_use]
    pub fn by_month_day(mut self, days: impl IntoIterator<Item = i8>) -> Self {
        self.by.month_days.extend(days);
        self
    }

    #[must_use]
    pub fn by_year_day(mut self, days: impl IntoIterator<Item = i16>) -> Self {
        self.by.year_days.extend(days);
        self
    }

    #[must_use]
    pub fn by_week_no(mut self, weeks: impl IntoIterator<Item = i8>) -> Self {
        self.by.week_numbers.extend(weeks);
        self
    }

    #[must_use]
    pub fn by_month(mut self, months: impl IntoIterator<Item = u8>) -> Self {
        self.by.months.extend(months);
        self
    }

    #[must_use]
    pub fn by_hour(mut self, hours: impl IntoIterator<Item = u8>) -> Self {
        self.by.hours.extend(hours);
        self
    }

    #[must_use]
    pub fn by_minute(mut self, minutes: impl IntoIterator<Item = u8>) -> Self {
        self.by.minutes.extend(minutes);
        self
    }

    #[must_use]
    pub fn by_second(mut self, seconds: impl IntoIterator<Item = u8>) -> Self {
        self.by.seconds.extend(seconds);
        self
    }

    #[must_use]
    pub fn by_set_pos(mut self, positions: impl IntoIterator<Item = i32>) -> Self {
        self.by.set_positions.extend(positions);
        self
    }

    #[must_use]
    pub fn week_start(mut self, weekday: Weekday) -> Self {
        self.by.week_start = Some(weekday);
        self
    }

    #[must_use]
    pub fn add_date<T: TimeZone>(mut self, date: &DateTime<T>) -> Self {
        self.added.insert(date.with_timezone(&Utc));
        self
    }

    #[must_use]
    pub fn exclude_date<T: TimeZone>(mut self, date: &DateTime<T>) -> Self {
        self.excluded.insert(date.with_timezone(&Utc));
        self
    }

    #[must_use]
    pub fn exclusion_rule(mut self, rule: RecurrenceRule) -> Self {
        self.exclusion_rule = Some(rule);
        self
    }

    /// ## Summary
    /// Validates the collected fields and produces a rule.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::InvalidRule` if:
    /// - the interval or count is zero
    /// - both COUNT and UNTIL are set
    /// - a BYxxx part is out of range or incompatible with the frequency
    /// - the exclusion rule carries its own date lists or exclusion rule
    pub fn build(self) -> RecurrenceResult<RecurrenceRule> {
        if self.interval == 0 {
            return Err(RecurrenceError::InvalidRule(
                "INTERVAL must be a positive integer".to_string(),
            ));
        }

        let termination = match (self.count, self.until) {
            (Some(_), Some(_)) => {
                return Err(RecurrenceError::InvalidRule(
                    "COUNT and UNTIL are mutually exclusive".to_string(),
                ));
            }
            (Some(0), None) => {
                return Err(RecurrenceError::InvalidRule(
                    "COUNT must be a positive integer".to_string(),
                ));
            }
            (Some(count), None) => Some(Termination::Count(count)),
            (None, Some(until)) => Some(Termination::Until(until)),
            (None, None) => None,
        };

        self.by.validate(self.frequency)?;

        let nested_exceptions = self.exclusion_rule.as_ref().is_some_and(|exclusion| {
            !exclusion.added.is_empty()
                || !exclusion.excluded.is_empty()
                || exclusion.exclusion_rule.is_some()
        });
        if nested_exceptions {
            return Err(RecurrenceError::InvalidRule(
                "an exclusion rule cannot carry its own dates or exclusion rule".to_string(),
            ));
        }

        let rule = RecurrenceRule {
            frequency: self.frequency,
            interval: self.interval,
            termination,
            by: self.by,
            added: self.added,
            excluded: self.excluded,
            exclusion_rule: self.exclusion_rule.map(Box::new),
        };
        tracing::trace!(rule = %rule, "Built recurrence rule");
        Ok(rule)
    }
}
