use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use uuid::Uuid;

use crate::models::{JournalEntryRow, NewJournalEntry, NewTask, TaskRow, UserRow};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url.to_string(),
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

// User database operations
pub mod users {
    use super::*;
    use shared_types::UpdatePreferencesRequest;

    pub async fn get_by_id(conn: &mut AsyncPgConnection, user_id: Uuid) -> anyhow::Result<UserRow> {
        use crate::schema::users::dsl::*;

        let user = users.filter(id.eq(user_id)).first::<UserRow>(conn).await?;

        Ok(user)
    }

    pub async fn get_by_email(
        conn: &mut AsyncPgConnection,
        email_val: &str,
    ) -> anyhow::Result<Option<UserRow>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(email.eq(email_val))
            .first::<UserRow>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        email_val: &str,
        name_val: Option<&str>,
        password_hash_val: &str,
    ) -> anyhow::Result<UserRow> {
        use crate::schema::users::dsl::*;

        let new_user = diesel::insert_into(users)
            .values((
                email.eq(email_val),
                name.eq(name_val),
                password_hash.eq(Some(password_hash_val)),
            ))
            .get_result::<UserRow>(conn)
            .await?;

        Ok(new_user)
    }

    /// Distinct IANA zone names across all users, so the rollover job can
    /// batch by zone instead of iterating users.
    pub async fn distinct_time_zones(conn: &mut AsyncPgConnection) -> anyhow::Result<Vec<String>> {
        use crate::schema::users::dsl::*;

        let zones = users
            .select(time_zone)
            .distinct()
            .load::<String>(conn)
            .await?;

        Ok(zones)
    }

    /// Users in a zone whose rollover watermark predates the given local date.
    pub async fn ids_pending_rollover(
        conn: &mut AsyncPgConnection,
        zone: &str,
        local_today: NaiveDate,
    ) -> anyhow::Result<Vec<Uuid>> {
        use crate::schema::users::dsl::*;

        let ids = users
            .filter(time_zone.eq(zone))
            .filter(
                last_rollover_date
                    .is_null()
                    .or(last_rollover_date.lt(local_today)),
            )
            .select(id)
            .load::<Uuid>(conn)
            .await?;

        Ok(ids)
    }

    pub async fn set_rollover_watermark(
        conn: &mut AsyncPgConnection,
        user_ids: &[Uuid],
        local_today: NaiveDate,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::users::dsl::*;

        let count = diesel::update(users.filter(id.eq_any(user_ids)))
            .set(last_rollover_date.eq(Some(local_today)))
            .execute(conn)
            .await?;

        Ok(count)
    }

    pub async fn set_task_streak(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        streak_days: i32,
        completed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set((
                task_streak_days.eq(streak_days),
                last_task_completion_date.eq(Some(completed_at)),
                updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn set_journal_streak(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        streak_days: i32,
        journaled_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set((
                journal_streak_days.eq(streak_days),
                last_journal_date.eq(Some(journaled_at)),
                updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn touch_last_login(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> anyhow::Result<()> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set(last_login_at.eq(Some(Utc::now())))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn update_password(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        password_hash_val: &str,
    ) -> anyhow::Result<()> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set((
                password_hash.eq(Some(password_hash_val)),
                updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn update_preferences(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        prefs: &UpdatePreferencesRequest,
    ) -> anyhow::Result<UserRow> {
        use crate::schema::users::dsl::*;

        // Update each field individually if provided
        if let Some(tz) = &prefs.time_zone {
            diesel::update(users.filter(id.eq(user_id)))
                .set(time_zone.eq(tz.as_str()))
                .execute(conn)
                .await?;
        }
        if let Some(dark) = prefs.dark_mode_enabled {
            diesel::update(users.filter(id.eq(user_id)))
                .set(dark_mode_enabled.eq(dark))
                .execute(conn)
                .await?;
        }
        if let Some(notif) = prefs.notifications_enabled {
            diesel::update(users.filter(id.eq(user_id)))
                .set(notifications_enabled.eq(notif))
                .execute(conn)
                .await?;
        }
        if let Some(sound) = prefs.sound_enabled {
            diesel::update(users.filter(id.eq(user_id)))
                .set(sound_enabled.eq(sound))
                .execute(conn)
                .await?;
        }
        if let Some(haptic) = prefs.haptic_enabled {
            diesel::update(users.filter(id.eq(user_id)))
                .set(haptic_enabled.eq(haptic))
                .execute(conn)
                .await?;
        }
        if let Some(reminder) = &prefs.daily_reminder_time {
            diesel::update(users.filter(id.eq(user_id)))
                .set(daily_reminder_time.eq(Some(reminder.as_str())))
                .execute(conn)
                .await?;
        }
        if let Some(check_in) = &prefs.evening_check_in_time {
            diesel::update(users.filter(id.eq(user_id)))
                .set(evening_check_in_time.eq(Some(check_in.as_str())))
                .execute(conn)
                .await?;
        }

        // Always update updated_at and return the result
        let updated = diesel::update(users.filter(id.eq(user_id)))
            .set(updated_at.eq(Utc::now()))
            .get_result::<UserRow>(conn)
            .await?;

        Ok(updated)
    }
}

// Task database operations
pub mod tasks {
    use super::*;
    use shared_types::{TaskQuery, TaskStatus};

    /// A task owned by the user and not soft-deleted.
    pub async fn get_owned(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        task_id: Uuid,
    ) -> anyhow::Result<Option<TaskRow>> {
        use crate::schema::tasks::dsl::*;

        let task = tasks
            .filter(id.eq(task_id))
            .filter(user_id.eq(owner_id))
            .filter(deleted_at.is_null())
            .first::<TaskRow>(conn)
            .await
            .optional()?;

        Ok(task)
    }

    /// Non-deleted subtasks of a parent, oldest first.
    pub async fn subtasks_of(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        parent_id: Uuid,
    ) -> anyhow::Result<Vec<TaskRow>> {
        use crate::schema::tasks::dsl::*;

        let rows = tasks
            .filter(parent_task_id.eq(Some(parent_id)))
            .filter(user_id.eq(owner_id))
            .filter(deleted_at.is_null())
            .order_by(created_at.asc())
            .load::<TaskRow>(conn)
            .await?;

        Ok(rows)
    }

    /// Top-level tasks (no parent), newest first, with optional status and
    /// deadline filters. Soft-deleted rows are always excluded.
    pub async fn list_top_level(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        query: &TaskQuery,
    ) -> anyhow::Result<Vec<TaskRow>> {
        use crate::schema::tasks::dsl::*;

        let mut q = tasks
            .filter(user_id.eq(owner_id))
            .filter(deleted_at.is_null())
            .filter(parent_task_id.is_null())
            .order_by(created_at.desc())
            .into_boxed();

        if let Some(status_filter) = query.status {
            q = q.filter(status.eq(status_filter.as_str().to_string()));
        }
        if let Some(deadline_filter) = query.deadline {
            q = q.filter(deadline.eq(deadline_filter.as_str().to_string()));
        }

        let rows = q.load::<TaskRow>(conn).await?;

        Ok(rows)
    }

    pub async fn insert(conn: &mut AsyncPgConnection, new_task: NewTask) -> anyhow::Result<TaskRow> {
        use crate::schema::tasks::dsl::*;

        let row = diesel::insert_into(tasks)
            .values(&new_task)
            .get_result::<TaskRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn update_fields(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        task_id: Uuid,
        input: &shared_types::UpdateTaskRequest,
    ) -> anyhow::Result<TaskRow> {
        use crate::schema::tasks::dsl::*;

        // Update each field individually if provided
        if let Some(t) = &input.title {
            diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
                .set(title.eq(t.as_str()))
                .execute(conn)
                .await?;
        }
        if let Some(d) = &input.description {
            diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
                .set(description.eq(Some(d.as_str())))
                .execute(conn)
                .await?;
        }
        if let Some(s) = input.status {
            diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
                .set(status.eq(s.as_str()))
                .execute(conn)
                .await?;
        }
        if let Some(dl) = input.deadline {
            diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
                .set(deadline.eq(dl.as_str()))
                .execute(conn)
                .await?;
        }

        // Always update updated_at and return the result
        let updated = diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
            .set(updated_at.eq(Utc::now()))
            .get_result::<TaskRow>(conn)
            .await?;

        Ok(updated)
    }

    pub async fn set_deadline(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        task_id: Uuid,
        bucket: shared_types::Deadline,
    ) -> anyhow::Result<TaskRow> {
        use crate::schema::tasks::dsl::*;

        let updated = diesel::update(tasks.filter(id.eq(task_id)).filter(user_id.eq(owner_id)))
            .set((deadline.eq(bucket.as_str()), updated_at.eq(Utc::now())))
            .get_result::<TaskRow>(conn)
            .await?;

        Ok(updated)
    }

    /// Mark a set of tasks COMPLETED with the same completion instant.
    pub async fn complete_many(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        task_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::tasks::dsl::*;

        let count = diesel::update(
            tasks
                .filter(id.eq_any(task_ids))
                .filter(user_id.eq(owner_id)),
        )
        .set((
            status.eq(TaskStatus::Completed.as_str()),
            completed_at.eq(Some(now)),
            updated_at.eq(now),
        ))
        .execute(conn)
        .await?;

        Ok(count)
    }

    /// Soft-delete a set of tasks. Rows are never physically removed.
    pub async fn soft_delete_many(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        task_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::tasks::dsl::*;

        let count = diesel::update(
            tasks
                .filter(id.eq_any(task_ids))
                .filter(user_id.eq(owner_id)),
        )
        .set((deleted_at.eq(Some(now)), updated_at.eq(now)))
        .execute(conn)
        .await?;

        Ok(count)
    }

    /// Rollover step 1: pending TODAY tasks of the given users go to SOMEDAY.
    pub async fn rollover_demote_today(
        conn: &mut AsyncPgConnection,
        user_ids: &[Uuid],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::tasks::dsl::*;

        let count = diesel::update(
            tasks
                .filter(user_id.eq_any(user_ids))
                .filter(deadline.eq(shared_types::Deadline::Today.as_str()))
                .filter(status.eq(TaskStatus::Pending.as_str()))
                .filter(deleted_at.is_null()),
        )
        .set(deadline.eq(shared_types::Deadline::Someday.as_str()))
        .execute(conn)
        .await?;

        Ok(count)
    }

    /// Rollover step 2: pending TOMORROW tasks of the given users go to TODAY.
    pub async fn rollover_promote_tomorrow(
        conn: &mut AsyncPgConnection,
        user_ids: &[Uuid],
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::tasks::dsl::*;

        let count = diesel::update(
            tasks
                .filter(user_id.eq_any(user_ids))
                .filter(deadline.eq(shared_types::Deadline::Tomorrow.as_str()))
                .filter(status.eq(TaskStatus::Pending.as_str()))
                .filter(deleted_at.is_null()),
        )
        .set(deadline.eq(shared_types::Deadline::Today.as_str()))
        .execute(conn)
        .await?;

        Ok(count)
    }

    /// Completion instants for the user's completed tasks since the cutoff.
    pub async fn completion_times_since(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<DateTime<Utc>>> {
        use crate::schema::tasks::dsl::*;

        let times = tasks
            .filter(user_id.eq(owner_id))
            .filter(status.eq(TaskStatus::Completed.as_str()))
            .filter(deleted_at.is_null())
            .filter(completed_at.is_not_null())
            .filter(completed_at.ge(Some(since)))
            .select(completed_at.assume_not_null())
            .load::<DateTime<Utc>>(conn)
            .await?;

        Ok(times)
    }

    /// (total, completed) counts over tasks created since the cutoff.
    pub async fn creation_window_counts(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        since: DateTime<Utc>,
    ) -> anyhow::Result<(i64, i64)> {
        use crate::schema::tasks::dsl::*;
        use diesel::dsl::count_star;

        let total: i64 = tasks
            .filter(user_id.eq(owner_id))
            .filter(deleted_at.is_null())
            .filter(created_at.ge(since))
            .select(count_star())
            .first(conn)
            .await?;

        let completed: i64 = tasks
            .filter(user_id.eq(owner_id))
            .filter(deleted_at.is_null())
            .filter(created_at.ge(since))
            .filter(status.eq(TaskStatus::Completed.as_str()))
            .select(count_star())
            .first(conn)
            .await?;

        Ok((total, completed))
    }
}

// Journal entry database operations
pub mod journal {
    use super::*;
    use shared_types::JournalQuery;

    pub async fn find_by_date(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Option<JournalEntryRow>> {
        use crate::schema::journal_entries::dsl::*;

        let entry = journal_entries
            .filter(user_id.eq(owner_id))
            .filter(entry_date.eq(date))
            .first::<JournalEntryRow>(conn)
            .await
            .optional()?;

        Ok(entry)
    }

    /// Insert or update the entry for (user, date). The compound unique index
    /// on (user_id, entry_date) makes two concurrent saves converge on one row.
    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        new_entry: NewJournalEntry,
    ) -> anyhow::Result<JournalEntryRow> {
        use crate::schema::journal_entries::dsl::*;

        let row = diesel::insert_into(journal_entries)
            .values(&new_entry)
            .on_conflict((user_id, entry_date))
            .do_update()
            .set((
                content.eq(new_entry.content.clone()),
                mood.eq(new_entry.mood.clone()),
                energy.eq(new_entry.energy),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<JournalEntryRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn list(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        query: &JournalQuery,
    ) -> anyhow::Result<Vec<JournalEntryRow>> {
        use crate::schema::journal_entries::dsl::*;

        let mut q = journal_entries
            .filter(user_id.eq(owner_id))
            .order_by(entry_date.desc())
            .into_boxed();

        if let Some(start) = query.start_date {
            q = q.filter(entry_date.ge(start));
        }
        if let Some(end) = query.end_date {
            q = q.filter(entry_date.le(end));
        }

        let limit_val = query.limit.unwrap_or(30).clamp(1, 100);
        let rows = q.limit(limit_val).load::<JournalEntryRow>(conn).await?;

        Ok(rows)
    }

    pub async fn update_fields(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        date: NaiveDate,
        input: &shared_types::UpdateJournalRequest,
    ) -> anyhow::Result<JournalEntryRow> {
        use crate::schema::journal_entries::dsl::*;

        if let Some(c) = &input.content {
            diesel::update(
                journal_entries
                    .filter(user_id.eq(owner_id))
                    .filter(entry_date.eq(date)),
            )
            .set(content.eq(c.as_str()))
            .execute(conn)
            .await?;
        }
        if let Some(m) = input.mood {
            diesel::update(
                journal_entries
                    .filter(user_id.eq(owner_id))
                    .filter(entry_date.eq(date)),
            )
            .set(mood.eq(Some(m.as_str())))
            .execute(conn)
            .await?;
        }
        if let Some(e) = input.energy {
            diesel::update(
                journal_entries
                    .filter(user_id.eq(owner_id))
                    .filter(entry_date.eq(date)),
            )
            .set(energy.eq(Some(e)))
            .execute(conn)
            .await?;
        }

        let updated = diesel::update(
            journal_entries
                .filter(user_id.eq(owner_id))
                .filter(entry_date.eq(date)),
        )
        .set(updated_at.eq(Utc::now()))
        .get_result::<JournalEntryRow>(conn)
        .await?;

        Ok(updated)
    }

    pub async fn delete(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<usize> {
        use crate::schema::journal_entries::dsl::*;

        let count = diesel::delete(
            journal_entries
                .filter(user_id.eq(owner_id))
                .filter(entry_date.eq(date)),
        )
        .execute(conn)
        .await?;

        Ok(count)
    }

    /// Entries on or after the given date, oldest first (mood trend order).
    pub async fn entries_since(
        conn: &mut AsyncPgConnection,
        owner_id: Uuid,
        from: NaiveDate,
    ) -> anyhow::Result<Vec<JournalEntryRow>> {
        use crate::schema::journal_entries::dsl::*;

        let rows = journal_entries
            .filter(user_id.eq(owner_id))
            .filter(entry_date.ge(from))
            .order_by(entry_date.asc())
            .load::<JournalEntryRow>(conn)
            .await?;

        Ok(rows)
    }
}
