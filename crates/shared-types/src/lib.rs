use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Task completion state, stored as VARCHAR: "PENDING" or "COMPLETED"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "diesel", derive(diesel::AsExpression))]
#[cfg_attr(feature = "diesel", diesel(sql_type = diesel::sql_types::Text))]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "COMPLETED" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// Scheduling bucket, not a calendar date. The rollover job moves pending
/// tasks TODAY -> SOMEDAY and TOMORROW -> TODAY at the user's local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "diesel", derive(diesel::AsExpression))]
#[cfg_attr(feature = "diesel", diesel(sql_type = diesel::sql_types::Text))]
pub enum Deadline {
    Today,
    Tomorrow,
    Someday,
}

impl Deadline {
    pub fn as_str(&self) -> &str {
        match self {
            Deadline::Today => "TODAY",
            Deadline::Tomorrow => "TOMORROW",
            Deadline::Someday => "SOMEDAY",
        }
    }
}

impl FromStr for Deadline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODAY" => Ok(Deadline::Today),
            "TOMORROW" => Ok(Deadline::Tomorrow),
            "SOMEDAY" => Ok(Deadline::Someday),
            other => Err(format!("unknown deadline bucket: {}", other)),
        }
    }
}

/// Journal mood on a fixed ordinal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "diesel", derive(diesel::AsExpression))]
#[cfg_attr(feature = "diesel", diesel(sql_type = diesel::sql_types::Text))]
pub enum Mood {
    Rough,
    Okay,
    Good,
    Great,
}

impl Mood {
    pub fn as_str(&self) -> &str {
        match self {
            Mood::Rough => "ROUGH",
            Mood::Okay => "OKAY",
            Mood::Good => "GOOD",
            Mood::Great => "GREAT",
        }
    }

    /// Numeric score used by the analytics mood trend (ROUGH=1 .. GREAT=4).
    pub fn score(&self) -> i32 {
        match self {
            Mood::Rough => 1,
            Mood::Okay => 2,
            Mood::Good => 3,
            Mood::Great => 4,
        }
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROUGH" => Ok(Mood::Rough),
            "OKAY" => Ok(Mood::Okay),
            "GOOD" => Ok(Mood::Good),
            "GREAT" => Ok(Mood::Great),
            other => Err(format!("unknown mood: {}", other)),
        }
    }
}

/// A unit of work. A task with a non-null `parent_task_id` is a subtask and
/// cannot itself have subtasks (one level of nesting only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub deadline: Deadline,
    pub completed_at: Option<DateTime<Utc>>,
    pub parent_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
}

/// One journal entry per user per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub entry_date: NaiveDate,
    pub content: String,
    pub mood: Option<Mood>,
    pub energy: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile returned by GET /api/user/me.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub time_zone: String,
    pub task_streak_days: i32,
    pub last_task_completion_date: Option<DateTime<Utc>>,
    pub journal_streak_days: i32,
    pub last_journal_date: Option<DateTime<Utc>>,
    pub dark_mode_enabled: bool,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub haptic_enabled: bool,
    pub daily_reminder_time: Option<String>,
    pub evening_check_in_time: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Auth API types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUserInfo {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: AuthUserInfo,
    pub access_token: String,
    pub refresh_token: String,
}

// Task API types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub deadline: Option<Deadline>,
    pub parent_task_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub deadline: Deadline,
}

// Journal API types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveJournalRequest {
    pub content: String,
    pub mood: Option<Mood>,
    pub energy: Option<i32>,
    /// YYYY-MM-DD; defaults to the current UTC date when absent.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJournalRequest {
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub energy: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

// User preference updates (PATCH /api/user/preferences)

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub time_zone: Option<String>,
    pub dark_mode_enabled: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub sound_enabled: Option<bool>,
    pub haptic_enabled: Option<bool>,
    pub daily_reminder_time: Option<String>,
    pub evening_check_in_time: Option<String>,
}

impl UpdatePreferencesRequest {
    /// True when no updatable field is present.
    pub fn is_empty(&self) -> bool {
        self.time_zone.is_none()
            && self.dark_mode_enabled.is_none()
            && self.notifications_enabled.is_none()
            && self.sound_enabled.is_none()
            && self.haptic_enabled.is_none()
            && self.daily_reminder_time.is_none()
            && self.evening_check_in_time.is_none()
    }
}

// Streak and analytics types

/// Result of a streak evaluation or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakUpdate {
    pub streak_days: i32,
    pub was_reset: bool,
}

/// One point of the 7-day mood trend chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPoint {
    /// "MM-dd" label for the chart axis.
    pub date: String,
    pub mood_score: i32,
    pub energy: i32,
    pub mood_label: Option<Mood>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub streak: u32,
    pub completion_rate: u32,
    pub total_tasks_last_7_days: usize,
    pub completed_tasks_last_7_days: usize,
    pub mood_trend: Vec<MoodPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_parses_wire_names() {
        assert_eq!("TOMORROW".parse::<Deadline>(), Ok(Deadline::Tomorrow));
        assert_eq!(Deadline::Someday.as_str(), "SOMEDAY");
        assert!("NEXT_WEEK".parse::<Deadline>().is_err());
    }

    #[test]
    fn mood_scores_are_ordinal() {
        assert_eq!(Mood::Rough.score(), 1);
        assert_eq!(Mood::Great.score(), 4);
        assert!(Mood::Okay.score() < Mood::Good.score());
    }

    #[test]
    fn enums_serialize_screaming_snake() {
        let json = serde_json::to_string(&TaskStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let mood: Mood = serde_json::from_str("\"GREAT\"").unwrap();
        assert_eq!(mood, Mood::Great);
    }

    #[test]
    fn task_subtasks_default_to_empty_on_deserialize() {
        let json = serde_json::json!({
            "id": Uuid::nil(),
            "user_id": Uuid::nil(),
            "title": "write report",
            "description": null,
            "status": "PENDING",
            "deadline": "TODAY",
            "completed_at": null,
            "parent_task_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert!(task.subtasks.is_empty());
    }
}
