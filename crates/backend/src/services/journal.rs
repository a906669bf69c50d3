//! Journal save flow. One entry per user per calendar day; the upsert
//! overwrites content/mood/energy in place, and only the save that created
//! the row advances the journal streak.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use diesel_async::AsyncPgConnection;
use shared_types::{JournalEntry, SaveJournalRequest};
use uuid::Uuid;

use crate::db;
use crate::models::{JournalEntryRow, NewJournalEntry};
use crate::streaks;

/// The date a save targets: the request's explicit date, else today (UTC).
pub fn resolve_entry_date(requested: Option<NaiveDate>, now: DateTime<Utc>) -> NaiveDate {
    requested.unwrap_or_else(|| now.date_naive())
}

/// Whether this save is new activity. A re-save of an existing day's entry
/// is an edit, not activity, and must not advance the streak again.
pub fn advances_streak(existing: Option<&JournalEntryRow>) -> bool {
    existing.is_none()
}

/// Upsert the entry for the resolved date and advance the journal streak
/// exactly once per newly created row. Streak failures are logged, never
/// propagated.
pub async fn save_entry(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    req: SaveJournalRequest,
    now: DateTime<Utc>,
) -> Result<JournalEntry> {
    let entry_date = resolve_entry_date(req.date, now);

    let existing = db::journal::find_by_date(conn, user_id, entry_date).await?;

    let row = db::journal::upsert(
        conn,
        NewJournalEntry {
            user_id,
            entry_date,
            content: req.content,
            mood: req.mood.map(|m| m.as_str().to_string()),
            energy: req.energy,
        },
    )
    .await?;

    if advances_streak(existing.as_ref()) {
        if let Err(e) = streaks::update_journal_streak(conn, user_id, now).await {
            tracing::error!("Failed to update journal streak for {}: {:?}", user_id, e);
        }
    }

    row.into_entry()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(s: &str) -> DateTime<Utc> {
        s.parse().expect("valid RFC 3339 instant")
    }

    fn entry_row(date: NaiveDate) -> JournalEntryRow {
        let at = instant("2024-01-05T08:00:00Z");
        JournalEntryRow {
            id: Uuid::from_u128(1),
            user_id: Uuid::from_u128(2),
            entry_date: date,
            content: "slept well".to_string(),
            mood: None,
            energy: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn only_the_first_save_of_a_date_advances_the_streak() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();

        // Two saves for the same date: the first finds no row, the second
        // finds the one the first created.
        let mut existing: Option<JournalEntryRow> = None;
        let mut streak_updates = 0;
        for _ in 0..2 {
            if advances_streak(existing.as_ref()) {
                streak_updates += 1;
            }
            existing = Some(entry_row(date));
        }

        assert_eq!(streak_updates, 1);
    }

    #[test]
    fn saving_without_a_date_targets_the_current_utc_day() {
        let now = instant("2024-01-05T23:30:00Z");
        assert_eq!(
            resolve_entry_date(None, now),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );

        let explicit = NaiveDate::from_ymd_opt(2023, 12, 24).unwrap();
        assert_eq!(resolve_entry_date(Some(explicit), now), explicit);
    }
}
