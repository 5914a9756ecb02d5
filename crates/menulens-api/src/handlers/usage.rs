//! Quota usage observability handler.

use axum::{extract::State, Json};
use serde::Serialize;

use menulens_quota::ApiUsageStats;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub apis: Vec<ApiUsageStats>,
}

/// Current per-API quota usage. For dashboards, not control flow.
#[utoipa::path(get, path = "/api/v1/usage", tag = "System",
    responses((status = 200, description = "Per-API usage snapshot")))]
pub async fn usage_stats(
    State(state): State<AppState>,
) -> Result<Json<UsageResponse>, ApiError> {
    let apis = state.limiter.usage_stats().await;
    Ok(Json(UsageResponse { apis }))
}
