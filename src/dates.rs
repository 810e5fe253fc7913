//! Season-aware date parsing for the "Mon D" style strings used by the
//! blackout sheet.
//!
//! The sheet never writes years. The season straddles New Year, so months
//! July through December belong to the season start year and January through
//! June belong to the following year.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub const SEASON_START_YEAR: i32 = 2025;

const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Month number (1-12) for a three-letter English abbreviation.
pub fn month_from_abbrev(abbrev: &str) -> Option<u32> {
    MONTH_ABBREVS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbrev))
        .map(|i| i as u32 + 1)
}

/// Whether the string starts with a month abbreviation ("Jan 5", "Dec 25 - 31").
pub fn starts_with_month(s: &str) -> bool {
    s.split_whitespace()
        .next()
        .and_then(month_from_abbrev)
        .is_some()
}

/// Resolve the implied year for a month within the ski season.
pub fn season_year(month: u32) -> i32 {
    if (7..=12).contains(&month) {
        SEASON_START_YEAR
    } else {
        SEASON_START_YEAR + 1
    }
}

/// Parse a single "Mon D" string (e.g. "Jan 1") into a date with the season
/// year applied.
pub fn parse_month_day(s: &str) -> Result<NaiveDate> {
    let mut parts = s.split_whitespace();
    let month_str = parts.next().context("empty date string")?;
    let day_str = parts
        .next()
        .with_context(|| format!("date '{}' is missing a day", s))?;
    let month = month_from_abbrev(month_str)
        .with_context(|| format!("unrecognized month in date '{}'", s))?;
    let day: u32 = day_str
        .parse()
        .with_context(|| format!("unparseable day in date '{}'", s))?;
    NaiveDate::from_ymd_opt(season_year(month), month, day)
        .with_context(|| format!("invalid calendar date '{}'", s))
}

/// Split a "Mon D - Mon D" range into start and end dates. When the end omits
/// the month ("Feb 14 - 16") it inherits the start's month.
pub fn split_date_range(range: &str) -> Result<(NaiveDate, NaiveDate)> {
    let (start_str, end_str) = range
        .split_once(" - ")
        .with_context(|| format!("date range '{}' has no ' - ' separator", range))?;

    let start = parse_month_day(start_str.trim())?;

    let end_trimmed = end_str.trim();
    let end = if starts_with_month(end_trimmed) {
        parse_month_day(end_trimmed)?
    } else {
        let day: u32 = end_trimmed
            .parse()
            .with_context(|| format!("unparseable end day in range '{}'", range))?;
        NaiveDate::from_ymd_opt(start.year(), start.month(), day)
            .with_context(|| format!("invalid end date in range '{}'", range))?
    };

    if end < start {
        bail!("date range '{}' ends before it starts", range);
    }
    Ok((start, end))
}

/// All dates from start to end, inclusive.
pub fn dates_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = start;
    while current <= end {
        dates.push(current);
        match current.checked_add_signed(Duration::days(1)) {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

/// Keep only the dates falling on the given weekday.
pub fn filter_weekday(dates: &[NaiveDate], weekday: Weekday) -> Vec<NaiveDate> {
    dates
        .iter()
        .copied()
        .filter(|d| d.weekday() == weekday)
        .collect()
}
