//! Recommendation HTTP handler.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use menulens_core::{Dish, Recommendation};

use super::DeviceQuery;
use crate::{ApiError, AppState};

/// Request body: the dishes from a prior analysis run.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecommendRequest {
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RecommendResponse {
    pub recommendations: Vec<Recommendation>,
    pub message: String,
}

/// Rank up to three dishes against the device's stored preferences.
///
/// # Returns
/// - 200 OK with recommendations (possibly empty: "no match found")
/// - 400 Bad Request when no preferences are saved or no dishes supplied
/// - 429 Too Many Requests on quota denial
#[utoipa::path(post, path = "/api/v1/recommendations", tag = "Recommendations",
    params(("deviceId" = String, Query, description = "Opaque device identity")),
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Ranked recommendations", body = RecommendResponse),
        (status = 400, description = "No preferences saved or no dishes supplied"),
        (status = 429, description = "Recommendation quota exceeded"),
    ))]
pub async fn recommend_dishes(
    State(state): State<AppState>,
    Query(query): Query<DeviceQuery>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    query.validate()?;
    if req.dishes.is_empty() {
        return Err(ApiError::BadRequest("No dishes supplied".to_string()));
    }

    let profile = state
        .db
        .preferences
        .get(&query.device_id)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest(
                "No preferences saved for this device yet. Please set preferences first."
                    .to_string(),
            )
        })?;

    let recommendations = state.recommender.recommend(&req.dishes, &profile).await?;

    let message = if recommendations.is_empty() {
        "No dish matched your preferences. Try another menu.".to_string()
    } else {
        format!("Top {} picks for you.", recommendations.len())
    };

    info!(
        subsystem = "api",
        component = "recommendations",
        op = "recommend",
        device_id = %query.device_id,
        dish_count = req.dishes.len(),
        result_count = recommendations.len(),
        "Recommendation request complete"
    );

    Ok(Json(RecommendResponse {
        recommendations,
        message,
    }))
}
