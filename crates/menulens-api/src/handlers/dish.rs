//! On-demand detailed dish description handler.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DishDetailRequest {
    pub name: String,
    /// The menu's own printed description, used as grounding context.
    #[serde(rename = "originalDescription")]
    pub original_description: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DishDetailResponse {
    pub name: String,
    pub description: String,
}

/// Generate a detailed description for one dish.
///
/// Never fails downstream: generation problems degrade to a fixed
/// unavailable string.
#[utoipa::path(post, path = "/api/v1/dish/detail", tag = "Analysis",
    request_body = DishDetailRequest,
    responses(
        (status = 200, description = "Detailed description", body = DishDetailResponse),
        (status = 400, description = "Blank dish name"),
    ))]
pub async fn dish_detail(
    State(state): State<AppState>,
    Json(req): Json<DishDetailRequest>,
) -> Result<Json<DishDetailResponse>, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Dish name must not be empty".to_string()));
    }

    let description = state
        .describer
        .detailed_description(name, req.original_description.as_deref())
        .await;

    Ok(Json(DishDetailResponse {
        name: name.to_string(),
        description,
    }))
}
