//! Profile and preference endpoints.

use axum::extract::State;
use axum::{Extension, Json};
use chrono_tz::Tz;
use shared_types::{UpdatePreferencesRequest, UserProfile};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<UserProfile>> {
    let mut conn = state.pool.get().await?;

    let row = db::users::get_by_id(&mut conn, user.id).await?;

    Ok(Json(row.into_profile()))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> ApiResult<Json<UserProfile>> {
    if req.is_empty() {
        return Err(ApiError::bad_request("No valid preference fields provided"));
    }

    // An unparseable zone would silently break rollover and streaks for this
    // user, so reject it here.
    if let Some(zone) = &req.time_zone {
        zone.parse::<Tz>()
            .map_err(|_| ApiError::bad_request(format!("Unknown time zone: {}", zone)))?;
    }

    let mut conn = state.pool.get().await?;

    let row = db::users::update_preferences(&mut conn, user.id, &req).await?;

    Ok(Json(row.into_profile()))
}
