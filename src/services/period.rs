//! Reporting periods and date windows.
//!
//! DESIGN
//! ======
//! Windows are computed on typed `time::Date` values and exposed as inclusive
//! `YYYY-MM-DD` bounds. Stored records are matched on the first ten characters
//! of their `date` string, compared lexicographically, so both plain dates and
//! full ISO timestamps fall on their calendar day.
//!
//! Two families of periods exist: trailing windows anchored at today (admin
//! dashboard) and calendar windows containing an anchor date (synthesis).

use serde::{Deserialize, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime};

// =============================================================================
// DATE HELPERS
// =============================================================================

/// The calendar-day prefix of a stored date string.
#[must_use]
pub fn date_key(raw: &str) -> &str {
    raw.get(..10).unwrap_or(raw)
}

#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Parse the calendar day of a stored date string.
#[must_use]
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(date_key(raw.trim()), format_description!("[year]-[month]-[day]")).ok()
}

/// Today in UTC.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Current instant as an RFC 3339 timestamp.
#[must_use]
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Latest valid day of `month` not after `day`.
fn clamp_day(year: i32, month: Month, day: u8) -> Option<Date> {
    (1..=day)
        .rev()
        .find_map(|d| Date::from_calendar_date(year, month, d).ok())
}

/// Step back `months` calendar months, clamping to the last day of the
/// target month (2024-03-31 minus one month is 2024-02-29).
#[must_use]
pub fn subtract_months(date: Date, months: u32) -> Date {
    let months = i32::try_from(months).unwrap_or(i32::MAX / 2);
    let index = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - months;
    let year = index.div_euclid(12);
    let month = u8::try_from(index.rem_euclid(12) + 1)
        .ok()
        .and_then(|m| Month::try_from(m).ok());
    month
        .and_then(|m| clamp_day(year, m, date.day()))
        .unwrap_or(Date::MIN)
}

fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(*date))
}

// =============================================================================
// DATE WINDOW
// =============================================================================

/// Inclusive `[start, end]` day range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    #[serde(serialize_with = "serialize_date")]
    pub start: Date,
    #[serde(serialize_with = "serialize_date")]
    pub end: Date,
    #[serde(skip)]
    start_key: String,
    #[serde(skip)]
    end_key: String,
}

impl DateWindow {
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end, start_key: format_date(start), end_key: format_date(end) }
    }

    #[must_use]
    pub fn single_day(day: Date) -> Self {
        Self::new(day, day)
    }

    #[must_use]
    pub fn start_key(&self) -> &str {
        &self.start_key
    }

    #[must_use]
    pub fn end_key(&self) -> &str {
        &self.end_key
    }

    /// Whether a stored date string falls inside the window.
    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        let key = date_key(raw);
        key >= self.start_key.as_str() && key <= self.end_key.as_str()
    }
}

// =============================================================================
// PERIODS
// =============================================================================

/// Trailing window ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingPeriod {
    Today,
    Week,
    #[default]
    Month,
    Quarter,
}

impl TrailingPeriod {
    #[must_use]
    pub fn window(self, today: Date) -> DateWindow {
        let start = match self {
            Self::Today => today,
            Self::Week => today.checked_sub(Duration::days(7)).unwrap_or(Date::MIN),
            Self::Month => subtract_months(today, 1),
            Self::Quarter => subtract_months(today, 3),
        };
        DateWindow::new(start, today)
    }
}

/// Calendar window containing an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalendarPeriod {
    #[default]
    #[serde(rename = "jour")]
    Day,
    #[serde(rename = "semaine")]
    Week,
    #[serde(rename = "mois")]
    Month,
    #[serde(rename = "annee")]
    Year,
}

impl CalendarPeriod {
    #[must_use]
    pub fn window(self, anchor: Date) -> DateWindow {
        match self {
            Self::Day => DateWindow::single_day(anchor),
            Self::Week => {
                let offset = i64::from(anchor.weekday().number_days_from_monday());
                let monday = anchor.checked_sub(Duration::days(offset)).unwrap_or(anchor);
                let sunday = monday.checked_add(Duration::days(6)).unwrap_or(monday);
                DateWindow::new(monday, sunday)
            }
            Self::Month => {
                let first = anchor.replace_day(1).unwrap_or(anchor);
                let last = clamp_day(anchor.year(), anchor.month(), 31).unwrap_or(anchor);
                DateWindow::new(first, last)
            }
            Self::Year => {
                let first = Date::from_calendar_date(anchor.year(), Month::January, 1).unwrap_or(anchor);
                let last = Date::from_calendar_date(anchor.year(), Month::December, 31).unwrap_or(anchor);
                DateWindow::new(first, last)
            }
        }
    }
}

#[cfg(test)]
#[path = "period_test.rs"]
mod tests;
