//! Consecutive-day streak bookkeeping for task completions and journaling.
//!
//! Both streaks use the same rule over different backing fields: the day
//! difference between "today" and the last activity, both taken as calendar
//! dates in the user's own time zone, decides whether the streak holds (0),
//! extends (1), or resets (2 or more). Callers treat streak updates as
//! best-effort: failures are logged and never fail the primary operation.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use diesel_async::AsyncPgConnection;
use shared_types::StreakUpdate;
use uuid::Uuid;

use crate::db;

fn parse_zone(zone: &str) -> Result<Tz> {
    zone.parse::<Tz>()
        .map_err(|_| anyhow!("invalid time zone: {}", zone))
}

/// Pure streak evaluation. Does not mutate anything.
///
/// Same-day activity returns the current count unchanged, which makes the
/// whole operation idempotent within one local day.
pub fn evaluate(
    current_streak: i32,
    last_activity: Option<DateTime<Utc>>,
    tz: Tz,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let today = now.with_timezone(&tz).date_naive();

    // First-ever activity starts the streak at 1.
    let Some(last) = last_activity else {
        return StreakUpdate {
            streak_days: 1,
            was_reset: false,
        };
    };

    let last_day = last.with_timezone(&tz).date_naive();

    match (today - last_day).num_days() {
        0 => StreakUpdate {
            streak_days: current_streak,
            was_reset: false,
        },
        1 => StreakUpdate {
            streak_days: current_streak + 1,
            was_reset: false,
        },
        // Gap of two or more days, no partial credit.
        _ => StreakUpdate {
            streak_days: 1,
            was_reset: true,
        },
    }
}

/// Evaluate the task streak for a user without persisting anything.
pub async fn calculate_task_streak(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StreakUpdate> {
    let user = db::users::get_by_id(conn, user_id).await?;
    let tz = parse_zone(&user.time_zone)?;

    Ok(evaluate(
        user.task_streak_days,
        user.last_task_completion_date,
        tz,
        now,
    ))
}

/// Evaluate the journal streak for a user without persisting anything.
pub async fn calculate_journal_streak(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StreakUpdate> {
    let user = db::users::get_by_id(conn, user_id).await?;
    let tz = parse_zone(&user.time_zone)?;

    Ok(evaluate(
        user.journal_streak_days,
        user.last_journal_date,
        tz,
        now,
    ))
}

/// Recompute and persist the task streak after a completion. Stores the full
/// completion instant, not just the local date.
pub async fn update_task_streak(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StreakUpdate> {
    let outcome = calculate_task_streak(conn, user_id, now).await?;
    db::users::set_task_streak(conn, user_id, outcome.streak_days, now).await?;

    Ok(outcome)
}

/// Recompute and persist the journal streak after a new entry is created.
pub async fn update_journal_streak(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<StreakUpdate> {
    let outcome = calculate_journal_streak(conn, user_id, now).await?;
    db::users::set_journal_streak(conn, user_id, outcome.streak_days, now).await?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC 3339 instant")
    }

    #[test]
    fn first_activity_starts_at_one() {
        let out = evaluate(0, None, UTC, instant("2024-01-05T12:00:00Z"));
        assert_eq!(
            out,
            StreakUpdate {
                streak_days: 1,
                was_reset: false
            }
        );
    }

    #[test]
    fn same_day_activity_keeps_count_unchanged() {
        let now = instant("2024-01-05T18:00:00Z");
        let last = Some(instant("2024-01-05T08:00:00Z"));

        let first = evaluate(4, last, UTC, now);
        let second = evaluate(first.streak_days, last, UTC, now);

        assert_eq!(first.streak_days, 4);
        assert!(!first.was_reset);
        // Idempotent within the same local day.
        assert_eq!(second, first);
    }

    #[test]
    fn yesterday_extends_streak() {
        let out = evaluate(
            4,
            Some(instant("2024-01-04T23:59:00Z")),
            UTC,
            instant("2024-01-05T00:01:00Z"),
        );
        assert_eq!(out.streak_days, 5);
        assert!(!out.was_reset);
    }

    #[test]
    fn gap_of_three_days_resets() {
        let out = evaluate(
            7,
            Some(instant("2024-01-02T12:00:00Z")),
            UTC,
            instant("2024-01-05T12:00:00Z"),
        );
        assert_eq!(
            out,
            StreakUpdate {
                streak_days: 1,
                was_reset: true
            }
        );
    }

    #[test]
    fn two_day_gap_resets_without_partial_credit() {
        let out = evaluate(
            2,
            Some(instant("2024-01-03T12:00:00Z")),
            UTC,
            instant("2024-01-05T12:00:00Z"),
        );
        assert_eq!(out.streak_days, 1);
        assert!(out.was_reset);
    }

    #[test]
    fn day_difference_uses_user_local_dates() {
        // 04:30 UTC on Jan 2 is 23:30 on Jan 1 in New York; 05:30 UTC is
        // 00:30 on Jan 2. Local dates differ by one day even though the
        // instants are an hour apart.
        let last = Some(instant("2024-01-02T04:30:00Z"));
        let now = instant("2024-01-02T05:30:00Z");

        let out = evaluate(3, last, New_York, now);
        assert_eq!(out.streak_days, 4);
        assert!(!out.was_reset);

        // The same pair of instants in UTC is same-day activity.
        let out_utc = evaluate(3, last, UTC, now);
        assert_eq!(out_utc.streak_days, 3);
    }

    #[test]
    fn zone_parsing_rejects_garbage() {
        assert!(parse_zone("America/New_York").is_ok());
        assert!(parse_zone("Mars/Olympus_Mons").is_err());
    }
}
