//! Thai government fiscal year helpers.
//!
//! A fiscal year runs 1 October to 30 September and is numbered in the
//! Buddhist era (Christian year + 543) of the year it *ends* in. October
//! through December therefore belong to the next fiscal year.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Offset between the Buddhist and Christian eras.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Number of fiscal years offered to filters (current plus previous).
pub const AVAILABLE_YEARS: i32 = 5;

/// First month (1-based) of a fiscal year.
const FISCAL_START_MONTH: u32 = 10;

pub fn christian_to_buddhist(year: i32) -> i32 {
    year + BUDDHIST_ERA_OFFSET
}

pub fn buddhist_to_christian(year: i32) -> i32 {
    year - BUDDHIST_ERA_OFFSET
}

/// Fiscal year (Buddhist era) containing `date`.
pub fn fiscal_year_of<D: Datelike>(date: &D) -> i32 {
    let be = christian_to_buddhist(date.year());
    if date.month() >= FISCAL_START_MONTH {
        be + 1
    } else {
        be
    }
}

/// Inclusive UTC bounds of a fiscal year: Oct 1 00:00:00.000 of the previous
/// Christian year to Sep 30 23:59:59.999.
///
/// Returns `None` for years that produce no valid calendar date.
pub fn fiscal_year_range(fiscal_year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let year = buddhist_to_christian(fiscal_year);
    let start_date = NaiveDate::from_ymd_opt(year - 1, FISCAL_START_MONTH, 1)?;
    let next_start = NaiveDate::from_ymd_opt(year, FISCAL_START_MONTH, 1)?;
    let start = Utc.from_utc_datetime(&start_date.and_hms_opt(0, 0, 0)?);
    let end = Utc.from_utc_datetime(&next_start.and_hms_opt(0, 0, 0)?) - Duration::milliseconds(1);
    Some((start, end))
}

pub fn is_in_fiscal_year(date: &DateTime<Utc>, fiscal_year: i32) -> bool {
    fiscal_year_range(fiscal_year).is_some_and(|(start, end)| *date >= start && *date <= end)
}

/// Current fiscal year plus the four before it, newest first.
pub fn available_fiscal_years<D: Datelike>(today: &D) -> Vec<i32> {
    let current = fiscal_year_of(today);
    (0..AVAILABLE_YEARS).map(|i| current - i).collect()
}

/// Parse a comma-separated list such as `"2568,2567"`.
///
/// Blank input yields an empty list. Duplicates are dropped, order is kept.
pub fn parse_fiscal_years(raw: &str) -> Result<Vec<i32>, String> {
    let mut years = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let year: i32 = part
            .parse()
            .map_err(|_| format!("Invalid fiscal year '{part}'"))?;
        if fiscal_year_range(year).is_none() {
            return Err(format!("Fiscal year {year} is out of range"));
        }
        if !years.contains(&year) {
            years.push(year);
        }
    }
    Ok(years)
}

/// Human-readable label, e.g. `"1 ต.ค. 2567 - 30 ก.ย. 2568"`.
pub fn format_fiscal_year_range(fiscal_year: i32) -> String {
    format!("1 ต.ค. {} - 30 ก.ย. {}", fiscal_year - 1, fiscal_year)
}
