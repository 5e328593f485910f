use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

/// Canonical key for a calendar day: `"{day}-{month}-{year}"` with a zero-based month.
///
/// Both the cache and the remote store are keyed by this string, so it must only
/// ever be built through [`DateKey::new`] or [`DateKey::from_date`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DateKey(String);

impl DateKey {
    /// No range validation; callers pass a real calendar date.
    pub fn new(day: u32, month0: u32, year: i32) -> Self {
        DateKey(format!("{}-{}-{}", day, month0, year))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.day(), date.month0(), date.year())
    }

    /// Accepts only keys that name a real date, and only in canonical form
    /// (no leading zeros, no padding).
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.splitn(3, '-');
        let day: u32 = parts.next()?.parse().ok()?;
        let month0: u32 = parts.next()?.parse().ok()?;
        let year: i32 = parts.next()?.parse().ok()?;

        NaiveDate::from_ymd_opt(year, month0 + 1, day)?;

        let key = Self::new(day, month0, year);
        (key.0 == input).then_some(key)
    }

    pub fn to_date(&self) -> Option<NaiveDate> {
        let mut parts = self.0.splitn(3, '-');
        let day: u32 = parts.next()?.parse().ok()?;
        let month0: u32 = parts.next()?.parse().ok()?;
        let year: i32 = parts.next()?.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month0 + 1, day)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of days in the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let first_of_month = date.with_day(1).unwrap_or(date);
    let first_of_next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };

    first_of_next
        .map(|next| next.signed_duration_since(first_of_month).num_days() as u32)
        .unwrap_or(31)
}

/// Column (Sunday = 0) of the first day of a month.
pub fn first_weekday_offset(year: i32, month0: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0)
}
