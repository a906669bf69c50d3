//! Dashboard analytics: current streak, weekly completion rate, mood trend.
//!
//! All date bucketing happens in the user's own time zone, matching the
//! streak bookkeeping, so a completion at 23:30 local never lands on the
//! next day's bucket just because the server runs on UTC.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use diesel_async::AsyncPgConnection;
use shared_types::{AnalyticsSummary, Mood, MoodPoint};
use std::collections::HashSet;
use uuid::Uuid;

use crate::db;
use crate::models::JournalEntryRow;

/// How far back the streak walk looks, in days.
const STREAK_WINDOW_DAYS: i64 = 30;

/// Trailing window for the completion rate and mood trend, in days
/// (inclusive of today).
const WEEK_WINDOW_DAYS: i64 = 7;

/// Bucket completion instants into local calendar dates.
pub fn completion_dates(times: &[DateTime<Utc>], tz: Tz) -> HashSet<NaiveDate> {
    times
        .iter()
        .map(|t| t.with_timezone(&tz).date_naive())
        .collect()
}

/// Walk backwards from today counting consecutive days with at least one
/// completion. Today itself is optional: a missing today does not break the
/// run, it just does not count. The walk is capped at the streak window.
pub fn current_streak(dates: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    if dates.contains(&today) {
        streak += 1;
    }

    let mut cursor = today - Duration::days(1);
    for _ in 0..STREAK_WINDOW_DAYS {
        if !dates.contains(&cursor) {
            break;
        }
        streak += 1;
        cursor -= Duration::days(1);
    }

    streak
}

/// Completed over created as a rounded percentage. Zero created means 0,
/// not a division error.
pub fn completion_rate(total: i64, completed: i64) -> u32 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u32
}

/// One journal entry as a chart point. Entries without a mood score 0 so the
/// chart can still plot energy for them.
pub fn mood_point(row: &JournalEntryRow) -> MoodPoint {
    let mood = row.mood.as_deref().and_then(|m| m.parse::<Mood>().ok());

    MoodPoint {
        date: row.entry_date.format("%m-%d").to_string(),
        mood_score: mood.map(|m| m.score()).unwrap_or(0),
        energy: row.energy.unwrap_or(0),
        mood_label: mood,
    }
}

/// The instant at which the trailing week begins: local midnight six days
/// ago. Falls back to a flat seven-day offset when that midnight does not
/// exist in the zone (DST jump).
fn week_window_start(tz: Tz, today: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    let first_day = today - Duration::days(WEEK_WINDOW_DAYS - 1);
    tz.from_local_datetime(&first_day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now - Duration::days(WEEK_WINDOW_DAYS))
}

/// Assemble the full analytics summary for one user.
pub async fn summary(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<AnalyticsSummary> {
    let user = db::users::get_by_id(conn, user_id).await?;
    let tz: Tz = user
        .time_zone
        .parse()
        .map_err(|_| anyhow!("invalid time zone: {}", user.time_zone))?;
    let today = now.with_timezone(&tz).date_naive();

    let streak_since = now - Duration::days(STREAK_WINDOW_DAYS + 1);
    let times = db::tasks::completion_times_since(conn, user_id, streak_since).await?;
    let streak = current_streak(&completion_dates(&times, tz), today);

    let window_start = week_window_start(tz, today, now);
    let (total, completed) = db::tasks::creation_window_counts(conn, user_id, window_start).await?;

    let first_day = today - Duration::days(WEEK_WINDOW_DAYS - 1);
    let entries = db::journal::entries_since(conn, user_id, first_day).await?;
    let mood_trend = entries.iter().map(mood_point).collect();

    Ok(AnalyticsSummary {
        streak,
        completion_rate: completion_rate(total, completed),
        total_tasks_last_7_days: total as usize,
        completed_tasks_last_7_days: completed as usize,
        mood_trend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC 3339 instant")
    }

    #[test]
    fn late_evening_completions_bucket_by_local_date() {
        // 04:30 UTC on Jan 2 is still Jan 1 in New York.
        let times = vec![instant("2024-01-02T04:30:00Z")];

        let ny = completion_dates(&times, New_York);
        assert!(ny.contains(&date(2024, 1, 1)));

        let utc = completion_dates(&times, UTC);
        assert!(utc.contains(&date(2024, 1, 2)));
    }

    #[test]
    fn streak_counts_today_and_consecutive_prior_days() {
        let dates: HashSet<NaiveDate> = [date(2024, 1, 5), date(2024, 1, 4), date(2024, 1, 3)]
            .into_iter()
            .collect();

        assert_eq!(current_streak(&dates, date(2024, 1, 5)), 3);
    }

    #[test]
    fn a_quiet_today_does_not_break_a_run_ending_yesterday() {
        let dates: HashSet<NaiveDate> = [date(2024, 1, 4), date(2024, 1, 3)].into_iter().collect();

        assert_eq!(current_streak(&dates, date(2024, 1, 5)), 2);
    }

    #[test]
    fn a_gap_before_yesterday_ends_the_walk() {
        // Jan 3 is missing, so only today and yesterday count.
        let dates: HashSet<NaiveDate> = [date(2024, 1, 5), date(2024, 1, 4), date(2024, 1, 2)]
            .into_iter()
            .collect();

        assert_eq!(current_streak(&dates, date(2024, 1, 5)), 2);
    }

    #[test]
    fn no_completions_means_zero_streak() {
        assert_eq!(current_streak(&HashSet::new(), date(2024, 1, 5)), 0);
    }

    #[test]
    fn streak_walk_is_capped_at_the_window() {
        let today = date(2024, 3, 1);
        let dates: HashSet<NaiveDate> = (0..120).map(|i| today - Duration::days(i)).collect();

        // Today plus thirty prior days.
        assert_eq!(current_streak(&dates, today), 31);
    }

    #[test]
    fn completion_rate_rounds_and_guards_zero() {
        assert_eq!(completion_rate(2, 1), 50);
        assert_eq!(completion_rate(3, 1), 33);
        assert_eq!(completion_rate(3, 2), 67);
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(4, 4), 100);
    }

    #[test]
    fn mood_points_map_scores_and_tolerate_missing_mood() {
        let at = instant("2024-01-05T12:00:00Z");
        let row = JournalEntryRow {
            id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(2),
            entry_date: date(2024, 1, 5),
            content: "busy day".to_string(),
            mood: Some("GREAT".to_string()),
            energy: Some(7),
            created_at: at,
            updated_at: at,
        };

        let point = mood_point(&row);
        assert_eq!(point.date, "01-05");
        assert_eq!(point.mood_score, 4);
        assert_eq!(point.energy, 7);
        assert_eq!(point.mood_label, Some(Mood::Great));

        let bare = JournalEntryRow {
            mood: None,
            energy: None,
            ..row
        };
        let point = mood_point(&bare);
        assert_eq!(point.mood_score, 0);
        assert_eq!(point.energy, 0);
        assert_eq!(point.mood_label, None);
    }
}
