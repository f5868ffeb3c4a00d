//! Human readable certificate lifetimes such as `"1 year"` or `"90 days"`.
//!
//! A [`Ttl`] is resolved to an absolute expiration once, when the configuration
//! is loaded. Year, month and day counts move the calendar; hour, minute and
//! second counts add a fixed duration.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use time::{Duration, Month, OffsetDateTime};

use crate::error::{PkiError, Result};

static TTL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s+(\S+)\s*$").expect("TTL pattern is valid"));

/// A TTL string together with the expiration it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ttl {
    raw: String,
    expiration: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TtlUnit {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl TtlUnit {
    fn parse(unit: &str) -> Result<Self> {
        match unit {
            "year" | "years" => Ok(TtlUnit::Years),
            "month" | "months" => Ok(TtlUnit::Months),
            "day" | "days" => Ok(TtlUnit::Days),
            "hour" | "hours" => Ok(TtlUnit::Hours),
            "minute" | "minutes" => Ok(TtlUnit::Minutes),
            "second" | "seconds" => Ok(TtlUnit::Seconds),
            other => Err(PkiError::ConfigParseError(format!(
                "unsupported TTL unit: {other}"
            ))),
        }
    }
}

impl Ttl {
    /// Parses `raw` and resolves it relative to `now`.
    ///
    /// # Errors
    /// Returns [`PkiError::ConfigParseError`] when the string is not of the form
    /// `<integer> <unit>`, the count is not an integer, the unit is unknown, or
    /// the resulting date cannot be represented.
    pub fn parse(raw: &str, now: OffsetDateTime) -> Result<Self> {
        let captures = TTL_PATTERN.captures(raw).ok_or_else(|| {
            PkiError::ConfigParseError(format!("TTL must look like '<count> <unit>', got '{raw}'"))
        })?;
        let count_token = &captures[1];
        let count: i64 = count_token.parse().map_err(|_| {
            PkiError::ConfigParseError(format!("invalid TTL count: {count_token}"))
        })?;
        let unit = TtlUnit::parse(&captures[2])?;

        let expiration = match unit {
            TtlUnit::Years => count.checked_mul(12).and_then(|m| add_months(now, m)),
            TtlUnit::Months => add_months(now, count),
            TtlUnit::Days => add_seconds(now, count, 86_400),
            TtlUnit::Hours => add_seconds(now, count, 3_600),
            TtlUnit::Minutes => add_seconds(now, count, 60),
            TtlUnit::Seconds => add_seconds(now, count, 1),
        }
        .ok_or_else(|| PkiError::ConfigParseError(format!("TTL '{raw}' is out of range")))?;

        Ok(Self {
            raw: raw.to_string(),
            expiration,
        })
    }

    /// The string as written in the configuration.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn expiration(&self) -> OffsetDateTime {
        self.expiration
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ttl: {}, expiration: {}}}", self.raw, self.expiration)
    }
}

/// Moves `at` by whole calendar months, clamping the day to the last day of
/// the target month (Jan 31 + 1 month is Feb 28 or Feb 29).
fn add_months(at: OffsetDateTime, months: i64) -> Option<OffsetDateTime> {
    let current = i64::from(at.year()) * 12 + i64::from(u8::from(at.month())) - 1;
    let target = current.checked_add(months)?;
    let year = i32::try_from(target.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(target.rem_euclid(12) + 1).ok()?).ok()?;
    let day = at.day().min(time::util::days_in_year_month(year, month));
    let date = time::Date::from_calendar_date(year, month, day).ok()?;
    Some(at.replace_date(date))
}

// UTC has no DST, so a calendar day is always 86 400 seconds.
fn add_seconds(at: OffsetDateTime, count: i64, unit_seconds: i64) -> Option<OffsetDateTime> {
    let seconds = count.checked_mul(unit_seconds)?;
    at.checked_add(Duration::seconds(seconds))
}
