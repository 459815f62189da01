//! Deadline date normalization and plausibility checks.
//!
//! Recruitment notices write dates as `15-02-2025`, `15.02.25` or `1/5/2025`.
//! Everything downstream works on the canonical `DD-MM-YYYY` form produced here.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;

/// Years accepted by the normalizer.
///
/// This window matches the recruitment cycle the tables in
/// `OrganizationDirectory` were written for. Notices outside it normalize to
/// nothing, so it must be moved forward before processing newer notices.
pub const VALID_YEARS: RangeInclusive<i32> = 2024..=2026;

/// Candidate deadlines on or after this day are not treated as upcoming.
///
/// Tied to the same recruitment cycle as [`VALID_YEARS`].
pub const FUTURE_HORIZON: NormalizedDate = NormalizedDate::from_parts(31, 12, 2025);

/// A date in canonical `DD-MM-YYYY` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizedDate {
    day: u32,
    month: u32,
    year: i32,
}

impl NormalizedDate {
    /// Builds a date from already validated parts. Used for static tables.
    pub const fn from_parts(day: u32, month: u32, year: i32) -> Self {
        Self { day, month, year }
    }

    /// Calendar date, or `None` for range-valid but impossible dates like `31-02-2025`.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}-{}", self.day, self.month, self.year)
    }
}

impl Serialize for NormalizedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Validity window and future horizon used when judging candidate deadlines.
#[derive(Debug, Clone)]
pub struct DeadlineWindow {
    years: RangeInclusive<i32>,
    horizon: NaiveDate,
}

impl Default for DeadlineWindow {
    fn default() -> Self {
        // FUTURE_HORIZON is a real calendar day, the fallback is unreachable.
        Self::new(VALID_YEARS, FUTURE_HORIZON.to_naive().unwrap_or(NaiveDate::MAX))
    }
}

impl DeadlineWindow {
    pub fn new(years: RangeInclusive<i32>, horizon: NaiveDate) -> Self {
        Self { years, horizon }
    }

    /// Normalizes a matched date token.
    ///
    /// `.` and `/` separators become `-`, the token must split into exactly
    /// three numeric parts, and a two digit year is read as `20YY`. Returns
    /// `None` when the token is malformed or falls outside the window; callers
    /// treat that as "try the next strategy".
    pub fn normalize(&self, raw: &str) -> Option<NormalizedDate> {
        let unified = raw.replace(['.', '/'], "-");
        let parts: Vec<&str> = unified.split('-').map(str::trim).collect();
        let [day, month, year] = parts.as_slice() else {
            return None;
        };

        let day: u32 = day.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        let mut year_value: i32 = year.parse().ok()?;
        if year.len() == 2 {
            year_value += 2000;
        }

        if (1..=31).contains(&day) && (1..=12).contains(&month) && self.years.contains(&year_value)
        {
            Some(NormalizedDate::from_parts(day, month, year_value))
        } else {
            None
        }
    }

    /// True when `date` lies strictly after `today` and strictly before the horizon.
    pub fn is_plausible_deadline(&self, date: &NormalizedDate, today: NaiveDate) -> bool {
        match date.to_naive() {
            Some(day) => today < day && day < self.horizon,
            None => false,
        }
    }
}
