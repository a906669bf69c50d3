//! Journal endpoints. One entry per user per calendar day; saving to an
//! existing date overwrites it, and only a genuinely new entry advances the
//! journal streak.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use shared_types::{JournalEntry, JournalQuery, SaveJournalRequest, UpdateJournalRequest};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services;
use crate::{db, AppState};

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::bad_request("Content must not be empty"));
    }
    Ok(())
}

fn validate_energy(energy: Option<i32>) -> Result<(), ApiError> {
    if let Some(e) = energy {
        if !(0..=10).contains(&e) {
            return Err(ApiError::bad_request("Energy must be between 0 and 10"));
        }
    }
    Ok(())
}

pub async fn save_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SaveJournalRequest>,
) -> ApiResult<Json<JournalEntry>> {
    validate_content(&req.content)?;
    validate_energy(req.energy)?;

    let mut conn = state.pool.get().await?;

    let entry = services::journal::save_entry(&mut conn, user.id, req, Utc::now()).await?;

    Ok(Json(entry))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<JournalQuery>,
) -> ApiResult<Json<Vec<JournalEntry>>> {
    let mut conn = state.pool.get().await?;

    let rows = db::journal::list(&mut conn, user.id, &query).await?;
    let entries = rows
        .into_iter()
        .map(|r| r.into_entry())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<JournalEntry>> {
    let mut conn = state.pool.get().await?;

    let row = db::journal::find_by_date(&mut conn, user.id, date)
        .await?
        .ok_or_else(|| ApiError::not_found("Journal entry"))?;

    Ok(Json(row.into_entry()?))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
    Json(req): Json<UpdateJournalRequest>,
) -> ApiResult<Json<JournalEntry>> {
    if let Some(content) = &req.content {
        validate_content(content)?;
    }
    validate_energy(req.energy)?;

    let mut conn = state.pool.get().await?;

    db::journal::find_by_date(&mut conn, user.id, date)
        .await?
        .ok_or_else(|| ApiError::not_found("Journal entry"))?;

    let row = db::journal::update_fields(&mut conn, user.id, date, &req).await?;

    Ok(Json(row.into_entry()?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<StatusCode> {
    let mut conn = state.pool.get().await?;

    let count = db::journal::delete(&mut conn, user.id, date).await?;
    if count == 0 {
        return Err(ApiError::not_found("Journal entry"));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_is_bounded_inclusive() {
        assert!(validate_energy(None).is_ok());
        assert!(validate_energy(Some(0)).is_ok());
        assert!(validate_energy(Some(10)).is_ok());
        assert!(validate_energy(Some(-1)).is_err());
        assert!(validate_energy(Some(11)).is_err());
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(validate_content("dear diary").is_ok());
        assert!(validate_content("  \n ").is_err());
    }
}
