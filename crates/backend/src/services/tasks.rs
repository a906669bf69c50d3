//! Task completion and deletion cascades.
//!
//! Completion propagates both ways, bounded to one parent/child hop:
//! completing a parent force-completes its incomplete subtasks, and
//! completing the last open subtask auto-completes the parent. Deletion is
//! always a soft delete and cascades from parent to subtasks.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use shared_types::{Task, TaskQuery};
use uuid::Uuid;

use crate::db;
use crate::models::TaskRow;
use crate::streaks;

/// Row mutations required to complete one task, computed before any write.
#[derive(Debug, PartialEq)]
pub struct CompletionPlan {
    /// The target task plus any of its incomplete subtasks.
    pub complete_ids: Vec<Uuid>,
    /// Parent to auto-complete once the target is done, if any.
    pub complete_parent: Option<Uuid>,
    /// The target was already COMPLETED; nothing is written and the streak
    /// does not advance.
    pub already_completed: bool,
}

/// Decide what a completion call must touch.
///
/// `subtasks` are the target's own non-deleted children (empty for a
/// subtask), `siblings` the non-deleted children of the target's parent
/// including the target itself (empty for a top-level task).
pub fn plan_completion(
    task: &TaskRow,
    subtasks: &[TaskRow],
    siblings: &[TaskRow],
    parent_completed: bool,
) -> CompletionPlan {
    if task.is_completed() {
        return CompletionPlan {
            complete_ids: Vec::new(),
            complete_parent: None,
            already_completed: true,
        };
    }

    let mut complete_ids: Vec<Uuid> = subtasks
        .iter()
        .filter(|s| !s.is_completed())
        .map(|s| s.id)
        .collect();
    complete_ids.push(task.id);

    // One hop up: the parent completes only when every sibling other than
    // the target is already done.
    let complete_parent = match task.parent_task_id {
        Some(parent_id)
            if !parent_completed
                && siblings
                    .iter()
                    .filter(|s| s.id != task.id)
                    .all(|s| s.is_completed()) =>
        {
            Some(parent_id)
        }
        _ => None,
    };

    CompletionPlan {
        complete_ids,
        complete_parent,
        already_completed: false,
    }
}

/// Complete a task, cascading per the plan, then update the user's task
/// streak exactly once. Returns `None` when the task does not exist, is
/// soft-deleted, or belongs to someone else.
///
/// Completion is idempotent: an already-COMPLETED task is returned as-is
/// and no streak update fires.
pub async fn complete_task(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    task_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Task>> {
    let Some(task) = db::tasks::get_owned(conn, owner_id, task_id).await? else {
        return Ok(None);
    };

    let (subtasks, siblings, parent_completed) = if task.is_completed() {
        (Vec::new(), Vec::new(), true)
    } else {
        let subtasks = if task.parent_task_id.is_none() {
            db::tasks::subtasks_of(conn, owner_id, task.id).await?
        } else {
            Vec::new()
        };

        let (siblings, parent_completed) = match task.parent_task_id {
            Some(parent_id) => {
                let siblings = db::tasks::subtasks_of(conn, owner_id, parent_id).await?;
                let parent_completed = db::tasks::get_owned(conn, owner_id, parent_id)
                    .await?
                    .map(|p| p.is_completed())
                    // A missing parent is treated as already settled; nothing
                    // to cascade into.
                    .unwrap_or(true);
                (siblings, parent_completed)
            }
            None => (Vec::new(), true),
        };

        (subtasks, siblings, parent_completed)
    };

    let plan = plan_completion(&task, &subtasks, &siblings, parent_completed);

    if plan.already_completed {
        let task = assemble_task(conn, owner_id, task).await?;
        return Ok(Some(task));
    }

    let plan_ref = &plan;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            db::tasks::complete_many(conn, owner_id, &plan_ref.complete_ids, now).await?;
            if let Some(parent_id) = plan_ref.complete_parent {
                db::tasks::complete_many(conn, owner_id, &[parent_id], now).await?;
            }
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    // Streak bookkeeping is best-effort auxiliary state; a failure here must
    // never fail the completion itself.
    if let Err(e) = streaks::update_task_streak(conn, owner_id, now).await {
        tracing::error!("Failed to update task streak for {}: {:?}", owner_id, e);
    }

    let refreshed = db::tasks::get_owned(conn, owner_id, task_id)
        .await?
        .context("Task disappeared during completion")?;
    let task = assemble_task(conn, owner_id, refreshed).await?;

    Ok(Some(task))
}

/// Soft-delete a task and, when it is a parent, its subtasks. Returns false
/// when the task was not found.
pub async fn delete_task(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    task_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(task) = db::tasks::get_owned(conn, owner_id, task_id).await? else {
        return Ok(false);
    };

    let mut ids: Vec<Uuid> = if task.parent_task_id.is_none() {
        db::tasks::subtasks_of(conn, owner_id, task.id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect()
    } else {
        Vec::new()
    };
    ids.push(task.id);

    let ids_ref = &ids;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        async move {
            db::tasks::soft_delete_many(conn, owner_id, ids_ref, now).await?;
            Ok(())
        }
        .scope_boxed()
    })
    .await?;

    Ok(true)
}

/// Top-level tasks with their nested subtasks, per the list filters.
pub async fn list_tasks(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    query: &TaskQuery,
) -> Result<Vec<Task>> {
    let rows = db::tasks::list_top_level(conn, owner_id, query).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(assemble_task(conn, owner_id, row).await?);
    }

    Ok(out)
}

/// A single task with its subtasks, or `None` when absent/deleted/foreign.
pub async fn get_task(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    task_id: Uuid,
) -> Result<Option<Task>> {
    match db::tasks::get_owned(conn, owner_id, task_id).await? {
        Some(row) => Ok(Some(assemble_task(conn, owner_id, row).await?)),
        None => Ok(None),
    }
}

/// Convert a row into the API type, loading subtasks for top-level tasks.
async fn assemble_task(
    conn: &mut AsyncPgConnection,
    owner_id: Uuid,
    row: TaskRow,
) -> Result<Task> {
    let subtasks = if row.parent_task_id.is_none() {
        db::tasks::subtasks_of(conn, owner_id, row.id)
            .await?
            .into_iter()
            .map(|s| s.into_task(Vec::new()))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };

    row.into_task(subtasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared_types::{Deadline, TaskStatus};

    fn row(id_byte: u8, status: TaskStatus, parent: Option<Uuid>) -> TaskRow {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        TaskRow {
            id: Uuid::from_u128(id_byte as u128),
            user_id: Uuid::from_u128(999),
            title: format!("task {}", id_byte),
            description: None,
            status: status.as_str().to_string(),
            deadline: Deadline::Today.as_str().to_string(),
            completed_at: None,
            parent_task_id: parent,
            deleted_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn completing_a_parent_takes_all_incomplete_subtasks_along() {
        let parent = row(1, TaskStatus::Pending, None);
        let subtasks = vec![
            row(2, TaskStatus::Pending, Some(parent.id)),
            row(3, TaskStatus::Completed, Some(parent.id)),
            row(4, TaskStatus::Pending, Some(parent.id)),
        ];

        let plan = plan_completion(&parent, &subtasks, &[], true);

        assert_eq!(
            plan.complete_ids,
            vec![subtasks[0].id, subtasks[2].id, parent.id]
        );
        assert_eq!(plan.complete_parent, None);
        assert!(!plan.already_completed);
    }

    #[test]
    fn an_already_completed_target_plans_no_writes() {
        let done = row(1, TaskStatus::Completed, None);
        let subtasks = vec![row(2, TaskStatus::Pending, Some(done.id))];

        let plan = plan_completion(&done, &subtasks, &[], true);

        // Re-completing is a no-op: no rows change and the streak update
        // that follows a real completion must not fire.
        assert!(plan.already_completed);
        assert!(plan.complete_ids.is_empty());
        assert_eq!(plan.complete_parent, None);
    }

    #[test]
    fn a_completed_subtask_target_never_recompletes_the_parent() {
        let parent_id = Uuid::from_u128(1);
        let target = row(2, TaskStatus::Completed, Some(parent_id));
        let siblings = vec![target.clone()];

        let plan = plan_completion(&target, &[], &siblings, false);

        assert!(plan.already_completed);
        assert_eq!(plan.complete_parent, None);
    }

    #[test]
    fn completing_the_last_subtask_auto_completes_the_parent() {
        let parent_id = Uuid::from_u128(1);
        let target = row(2, TaskStatus::Pending, Some(parent_id));
        let siblings = vec![
            target.clone(),
            row(3, TaskStatus::Completed, Some(parent_id)),
        ];

        let plan = plan_completion(&target, &[], &siblings, false);

        assert_eq!(plan.complete_ids, vec![target.id]);
        assert_eq!(plan.complete_parent, Some(parent_id));
    }

    #[test]
    fn completing_a_non_last_subtask_leaves_the_parent_pending() {
        let parent_id = Uuid::from_u128(1);
        let target = row(2, TaskStatus::Pending, Some(parent_id));
        let siblings = vec![
            target.clone(),
            row(3, TaskStatus::Pending, Some(parent_id)),
        ];

        let plan = plan_completion(&target, &[], &siblings, false);

        assert_eq!(plan.complete_ids, vec![target.id]);
        assert_eq!(plan.complete_parent, None);
    }

    #[test]
    fn an_already_completed_parent_is_not_recompleted() {
        let parent_id = Uuid::from_u128(1);
        let target = row(2, TaskStatus::Pending, Some(parent_id));
        let siblings = vec![target.clone()];

        let plan = plan_completion(&target, &[], &siblings, true);

        assert_eq!(plan.complete_parent, None);
    }
}
