// Database models for Diesel
use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use shared_types::{JournalEntry, Task, UserProfile};
use uuid::Uuid;

/// Database representation of a user row.
/// Streak counters and the rollover watermark live here; they are mutated
/// only by the streak calculator and the rollover job respectively.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub time_zone: String,
    pub task_streak_days: i32,
    pub last_task_completion_date: Option<DateTime<Utc>>,
    pub journal_streak_days: i32,
    pub last_journal_date: Option<DateTime<Utc>>,
    pub last_rollover_date: Option<NaiveDate>,
    pub dark_mode_enabled: bool,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub haptic_enabled: bool,
    pub daily_reminder_time: Option<String>,
    pub evening_check_in_time: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email,
            name: self.name,
            time_zone: self.time_zone,
            task_streak_days: self.task_streak_days,
            last_task_completion_date: self.last_task_completion_date,
            journal_streak_days: self.journal_streak_days,
            last_journal_date: self.last_journal_date,
            dark_mode_enabled: self.dark_mode_enabled,
            notifications_enabled: self.notifications_enabled,
            sound_enabled: self.sound_enabled,
            haptic_enabled: self.haptic_enabled,
            daily_reminder_time: self.daily_reminder_time,
            evening_check_in_time: self.evening_check_in_time,
            created_at: self.created_at,
        }
    }
}

/// Task row with status/deadline stored as VARCHAR ("PENDING", "TODAY", ...)
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub deadline: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub parent_task_id: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn is_completed(&self) -> bool {
        self.status == shared_types::TaskStatus::Completed.as_str()
    }

    /// Convert into the API type, attaching already-converted subtasks.
    pub fn into_task(self, subtasks: Vec<Task>) -> anyhow::Result<Task> {
        Ok(Task {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            status: self.status.parse().map_err(|e: String| anyhow!(e))?,
            deadline: self.deadline.parse().map_err(|e: String| anyhow!(e))?,
            completed_at: self.completed_at,
            parent_task_id: self.parent_task_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            subtasks,
        })
    }
}

/// Insertable struct for new tasks
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::tasks)]
pub struct NewTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub deadline: String,
    pub parent_task_id: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::journal_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JournalEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub content: String,
    pub mood: Option<String>,
    pub energy: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JournalEntryRow {
    pub fn into_entry(self) -> anyhow::Result<JournalEntry> {
        let mood = self
            .mood
            .map(|m| m.parse().map_err(|e: String| anyhow!(e)))
            .transpose()?;

        Ok(JournalEntry {
            id: self.id,
            user_id: self.user_id,
            entry_date: self.entry_date,
            content: self.content,
            mood,
            energy: self.energy,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for new journal entries
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::journal_entries)]
pub struct NewJournalEntry {
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub content: String,
    pub mood: Option<String>,
    pub energy: Option<i32>,
}
