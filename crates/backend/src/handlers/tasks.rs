//! Task CRUD plus the complete and reschedule actions. Handlers stay thin;
//! the cascade logic lives in `services::tasks`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use shared_types::{
    CreateTaskRequest, RescheduleRequest, Task, TaskQuery, TaskStatus, UpdateTaskRequest,
};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::NewTask;
use crate::services;
use crate::{db, AppState};

const MAX_TITLE_LEN: usize = 255;

fn validate_title(title: &str) -> Result<(), ApiError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request("Title must not be empty"));
    }
    if trimmed.len() > MAX_TITLE_LEN {
        return Err(ApiError::bad_request("Title must be at most 255 characters"));
    }
    Ok(())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let mut conn = state.pool.get().await?;

    let tasks = services::tasks::list_tasks(&mut conn, user.id, &query).await?;

    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    validate_title(&req.title)?;

    let mut conn = state.pool.get().await?;

    // Nesting is one level deep: a subtask's parent must itself be
    // top-level.
    if let Some(parent_id) = req.parent_task_id {
        let parent = db::tasks::get_owned(&mut conn, user.id, parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent task"))?;
        if parent.parent_task_id.is_some() {
            return Err(ApiError::bad_request(
                "Subtasks cannot have their own subtasks",
            ));
        }
    }

    let new_task = NewTask {
        user_id: user.id,
        title: req.title.trim().to_string(),
        description: req.description,
        status: req.status.unwrap_or(TaskStatus::Pending).as_str().to_string(),
        deadline: req
            .deadline
            .unwrap_or(shared_types::Deadline::Today)
            .as_str()
            .to_string(),
        parent_task_id: req.parent_task_id,
    };

    let row = db::tasks::insert(&mut conn, new_task).await?;
    let task = row.into_task(Vec::new())?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let mut conn = state.pool.get().await?;

    let task = services::tasks::get_task(&mut conn, user.id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    if let Some(title) = &req.title {
        validate_title(title)?;
    }

    let mut conn = state.pool.get().await?;

    db::tasks::get_owned(&mut conn, user.id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    db::tasks::update_fields(&mut conn, user.id, task_id, &req).await?;

    let task = services::tasks::get_task(&mut conn, user.id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let mut conn = state.pool.get().await?;

    let deleted = services::tasks::delete_task(&mut conn, user.id, task_id, Utc::now()).await?;
    if !deleted {
        return Err(ApiError::not_found("Task"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let mut conn = state.pool.get().await?;

    let task = services::tasks::complete_task(&mut conn, user.id, task_id, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

pub async fn reschedule_task(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> ApiResult<Json<Task>> {
    let mut conn = state.pool.get().await?;

    db::tasks::get_owned(&mut conn, user.id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    db::tasks::set_deadline(&mut conn, user.id, task_id, req.deadline).await?;

    let task = services::tasks::get_task(&mut conn, user.id, task_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task"))?;

    Ok(Json(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_trimmed_and_bounded() {
        assert!(validate_title("Buy milk").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("").is_err());
        assert!(validate_title(&"x".repeat(255)).is_ok());
        assert!(validate_title(&"x".repeat(256)).is_err());
    }
}
