//! Analytics summary endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use chrono::Utc;
use shared_types::AnalyticsSummary;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services;
use crate::AppState;

pub async fn summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<AnalyticsSummary>> {
    let mut conn = state.pool.get().await?;

    let summary = services::analytics::summary(&mut conn, user.id, Utc::now()).await?;

    Ok(Json(summary))
}
