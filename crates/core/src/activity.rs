//! Activity feed merging and statistics periods.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::types::DbId;

pub const DEFAULT_FEED_LIMIT: i64 = 50;
pub const MAX_FEED_LIMIT: i64 = 100;
pub const DEFAULT_RECENT_LIMIT: i64 = 20;
pub const MAX_RECENT_LIMIT: i64 = 50;
pub const DEFAULT_PERIOD_DAYS: i64 = 7;
pub const MAX_PERIOD_DAYS: i64 = 365;
/// Entries in the top users / top tasks rankings.
pub const TOP_LIMIT: i64 = 10;

/// Where a recent-activity entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    History,
    Notification,
    Comment,
}

/// One entry of the caller's recent activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub source: ActivitySource,
    pub id: DbId,
    pub task_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Merge feeds into one list, newest first, cut to `limit`.
///
/// Ties on `created_at` are broken by source then descending id so the
/// order is stable across calls.
pub fn merge_newest_first(feeds: Vec<Vec<ActivityItem>>, limit: usize) -> Vec<ActivityItem> {
    let mut merged: Vec<ActivityItem> = feeds.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
            .then_with(|| b.id.cmp(&a.id))
    });
    merged.truncate(limit);
    merged
}

fn source_rank(source: ActivitySource) -> u8 {
    match source {
        ActivitySource::History => 0,
        ActivitySource::Comment => 1,
        ActivitySource::Notification => 2,
    }
}

/// Clamp a feed limit into `1..=max`, using `default` when absent.
pub fn clamp_feed_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Parse a statistics period such as `"7d"` or `"30"` into a day count.
pub fn parse_period(raw: Option<&str>) -> Result<i64, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_PERIOD_DAYS);
    };
    let digits = raw.strip_suffix('d').unwrap_or(raw);
    let days: i64 = digits
        .parse()
        .map_err(|_| format!("Invalid period '{raw}', expected e.g. 7d"))?;
    if !(1..=MAX_PERIOD_DAYS).contains(&days) {
        return Err(format!("Period must be between 1 and {MAX_PERIOD_DAYS} days"));
    }
    Ok(days)
}

/// Start of a period of `days` whole days ending today: midnight UTC of
/// the first day.
pub fn period_start(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(days - 1);
    first_day
        .and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or(now)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// One entry per day of the period, oldest first; days without rows count 0.
pub fn fill_daily_counts(rows: &[(NaiveDate, i64)], days: i64, today: NaiveDate) -> Vec<DailyCount> {
    (0..days)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let count = rows
                .iter()
                .filter(|(d, _)| *d == date)
                .map(|(_, c)| *c)
                .sum();
            DailyCount { date, count }
        })
        .collect()
}

/// Average per day, rounded to one decimal.
pub fn average_per_day(total: i64, days: i64) -> f64 {
    if days <= 0 {
        return 0.0;
    }
    (total as f64 / days as f64 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: ActivitySource, id: DbId, minute: u32) -> ActivityItem {
        ActivityItem {
            source,
            id,
            task_id: None,
            actor_user_id: None,
            text: format!("{id}"),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_merge_orders_newest_first_and_truncates() {
        let merged = merge_newest_first(
            vec![
                vec![item(ActivitySource::History, 1, 5), item(ActivitySource::History, 2, 1)],
                vec![item(ActivitySource::Notification, 7, 3)],
                vec![item(ActivitySource::Comment, 4, 9)],
            ],
            3,
        );
        let ids: Vec<DbId> = merged.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![4, 1, 7]);
    }

    #[test]
    fn test_merge_breaks_ties_by_source() {
        let merged = merge_newest_first(
            vec![
                vec![item(ActivitySource::Notification, 1, 0)],
                vec![item(ActivitySource::History, 2, 0)],
            ],
            10,
        );
        assert_eq!(merged[0].source, ActivitySource::History);
    }

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period(None), Ok(7));
        assert_eq!(parse_period(Some("30d")), Ok(30));
        assert_eq!(parse_period(Some("14")), Ok(14));
        assert!(parse_period(Some("0d")).is_err());
        assert!(parse_period(Some("week")).is_err());
        assert!(parse_period(Some("400d")).is_err());
    }

    #[test]
    fn test_period_start_is_midnight_of_first_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 15, 30, 0).unwrap();
        assert_eq!(
            period_start(7, now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_fill_daily_counts_pads_missing_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let rows = vec![(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(), 4)];
        let series = fill_daily_counts(&rows, 3, today);
        let counts: Vec<i64> = series.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![0, 4, 0]);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    }

    #[test]
    fn test_average_per_day() {
        assert_eq!(average_per_day(10, 7), 1.4);
        assert_eq!(average_per_day(0, 7), 0.0);
    }

    #[test]
    fn test_clamp_feed_limit() {
        assert_eq!(clamp_feed_limit(None, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT), 20);
        assert_eq!(clamp_feed_limit(Some(500), DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT), 50);
        assert_eq!(clamp_feed_limit(Some(0), DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT), 1);
    }
}
